//! Render Pipeline
//!
//! - [`pass`]: the [`Pass`] trait and the input/output slots every pass has
//! - [`passes`]: geometry, effect and copy passes
//! - [`buffer_manager`]: allocation and ownership of render targets
//! - [`io_manager`]: the buffer resolver
//! - [`render_pipeline`]: [`RenderPipeline`], tying it all together

pub mod buffer_manager;
pub mod io_manager;
pub mod pass;
pub mod passes;
pub mod render_pipeline;

pub use buffer_manager::BufferManager;
pub use io_manager::{IoManager, ResolveReport};
pub use pass::{FrameContext, Input, Output, Pass, PassBase, PassId, PassKind, TextureBinding};
pub use passes::{CopyPass, EffectPass, GeometryPass};
pub use render_pipeline::RenderPipeline;

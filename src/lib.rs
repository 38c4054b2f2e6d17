#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Prism: a post-processing core.
//!
//! Merges independently authored shader effects into one generated program
//! per active combination, and resolves which buffers every pass of a render
//! pipeline reads and writes, G-Buffer channels included.

pub mod device;
pub mod effects;
pub mod errors;
pub mod pipeline;
pub mod resources;
pub mod settings;
pub mod utils;

pub use device::{DeviceLimits, DrawTarget, FullscreenDraw, GeometryDraw, RenderDevice};
pub use effects::{
    BlendFunction, BlendMode, CombinationKey, Effect, EffectAttributes, EffectId, EffectMaterial,
    EffectMaterialManager, EffectShaderData,
};
pub use errors::{EffectError, PassError, PrismError, Result};
pub use pipeline::{
    CopyPass, EffectPass, GeometryPass, Pass, PassKind, RenderPipeline, ResolveReport,
};
pub use resources::{
    ColorSpace, GBufferComponents, GBufferLayout, Precision, RenderTarget, Resource,
    ResourceRegistry, ShaderData, ShaderDefines, UniformValue,
};
pub use settings::PipelineSettings;
pub use utils::interner;

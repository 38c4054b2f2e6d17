//! Core resource definitions
//!
//! Data structures shared by the effect merger and the buffer resolver. None
//! of them talk to the GPU directly:
//! - [`Resource`] / [`ResourceRegistry`]: reference-counted shared values
//! - [`RenderTarget`]: CPU record of an off-screen buffer
//! - [`GBufferComponents`] / [`GBufferLayout`]: G-Buffer channels and indices
//! - [`ShaderDefines`], [`Uniforms`], [`ShaderData`]: macros and uniforms
//! - [`ChangeTracker`]: version counters used as change notifications

pub mod gbuffer;
pub mod render_target;
pub mod resource;
pub mod shader_data;
pub mod shader_defines;
pub mod uniforms;
pub mod version_tracker;

pub use gbuffer::{GBufferComponents, GBufferLayout};
pub use render_target::{
    ColorSpace, Precision, RenderTarget, RenderTargetDesc, TargetHandle, TextureInfo, TextureRef,
};
pub use resource::{Disposable, Resource, ResourceKey, ResourceRegistry, SharedRegistry};
pub use shader_data::ShaderData;
pub use shader_defines::ShaderDefines;
pub use uniforms::{UniformValue, Uniforms};
pub use version_tracker::ChangeTracker;

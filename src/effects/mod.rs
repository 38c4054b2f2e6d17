//! Effects and Effect Merging
//!
//! An [`Effect`] is an independently authored shader fragment. The
//! [`EffectMaterialManager`] links the enabled effects of a pass into one
//! generated program ([`EffectMaterial`]) per combination:
//!
//! - [`glsl`]: identifier scanner used to detect and rename symbols
//! - [`integration`]: per-effect symbol renaming into shared [`ShaderParts`]
//! - [`material_manager`]: combination keys, caching and pre-building
//! - [`shader_env`]: embedded templates the parts are spliced into

pub mod blend;
pub mod effect;
pub mod glsl;
pub mod integration;
pub mod material;
pub mod material_manager;
pub mod shader_env;
pub mod shader_parts;

pub use blend::{BlendFunction, BlendMode};
pub use effect::{Effect, EffectAttributes, EffectId};
pub use integration::{EffectShaderData, IntegrationResult, UniformBinding};
pub use material::{CombinationKey, EffectMaterial};
pub use material_manager::EffectMaterialManager;
pub use shader_parts::{Section, ShaderParts};

//! Render Device Boundary
//!
//! The crate never talks to a graphics API. Everything GPU-side goes through
//! the [`RenderDevice`] trait: allocating render targets, compiling merged
//! effect materials and issuing draws. Hosts implement it over their backend;
//! the test suite uses a recording mock.

use serde::{Deserialize, Serialize};

use crate::effects::EffectMaterial;
use crate::resources::{
    GBufferComponents, RenderTargetDesc, ResourceKey, TargetHandle, TextureRef, Uniforms,
};

/// Hardware limits the material manager checks generated programs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceLimits {
    /// Uniforms a fragment program may declare.
    pub max_fragment_uniforms: usize,
    /// Varyings shared between vertex and fragment stages.
    pub max_varyings: usize,
}

impl Default for DeviceLimits {
    /// Minimum values guaranteed by WebGL 2.
    fn default() -> Self {
        Self {
            max_fragment_uniforms: 224,
            max_varyings: 15,
        }
    }
}

/// Where a draw writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    /// The default framebuffer.
    Screen,
    /// An off-screen target allocated through [`RenderDevice::create_target`].
    Texture(ResourceKey),
}

/// A full-screen triangle draw of a compiled effect material.
#[derive(Debug)]
pub struct FullscreenDraw<'a> {
    pub label: &'a str,
    pub material: &'a EffectMaterial,
    /// Default input, sampled as `inputBuffer`.
    pub input: Option<TextureRef>,
    /// Bound G-Buffer channels (`depthBuffer`, `normalBuffer`, ...).
    pub buffers: &'a [(GBufferComponents, TextureRef)],
    pub uniforms: &'a Uniforms,
    pub target: DrawTarget,
}

/// Scene geometry rendered into a (G-)Buffer.
#[derive(Debug)]
pub struct GeometryDraw<'a> {
    pub label: &'a str,
    /// Attachment count of the destination; every channel is cleared first
    /// when `clear` is set.
    pub attachments: usize,
    pub clear: bool,
    pub target: DrawTarget,
}

/// Device collaborator of the render pipeline.
pub trait RenderDevice {
    fn limits(&self) -> DeviceLimits;

    /// Allocates GPU storage for a render target.
    fn create_target(&mut self, desc: &RenderTargetDesc) -> Box<dyn TargetHandle>;

    /// Compiles a merged material. Called once per material instance; devices
    /// may deduplicate by [`EffectMaterial::source_hash`].
    fn compile(&mut self, material: &EffectMaterial);

    fn draw_fullscreen(&mut self, draw: &FullscreenDraw<'_>);

    fn draw_geometry(&mut self, draw: &GeometryDraw<'_>);
}

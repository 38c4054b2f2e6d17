//! Pass Abstraction
//!
//! Every stage of a [`RenderPipeline`](super::RenderPipeline) implements
//! [`Pass`]. The pipeline itself only manipulates the [`PassBase`] of each
//! pass: its enabled flag, its [`Input`] and its [`Output`]. Everything
//! pass-specific happens in [`Pass::prepare`] and [`Pass::render`].
//!
//! Changes that affect buffer wiring (toggling a pass, changing the G-Buffer
//! components it reads, its default-input slot or its read precision) bump the
//! pass's topology tracker; the pipeline compares versions and re-resolves.

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;

use crate::device::{DeviceLimits, DrawTarget, RenderDevice};
use crate::errors::PassError;
use crate::resources::{
    ChangeTracker, GBufferComponents, GBufferLayout, Precision, RenderTarget, Resource,
    ResourceKey, SharedRegistry, TextureRef,
};
use crate::settings::PipelineSettings;

static NEXT_PASS_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identity of a pass, independent of its position in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u32);

impl PassId {
    fn next() -> Self {
        Self(NEXT_PASS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Renders scene geometry into the G-Buffer.
    Geometry,
    /// Runs merged effect materials.
    Effect,
    Other,
}

/// A reference-counted pointer at one attachment of a render target.
#[derive(Debug, Default)]
pub struct TextureBinding {
    target: Option<Resource<RenderTarget>>,
    attachment: u32,
}

impl TextureBinding {
    /// Points the binding at `texture`, retaining its target.
    pub fn bind(&mut self, registry: &SharedRegistry<RenderTarget>, texture: TextureRef) {
        self.attachment = texture.attachment;
        match self.target.as_mut() {
            Some(resource) => resource.set(Some(texture.target)),
            None => self.target = Some(Resource::with_value(registry, texture.target)),
        }
    }

    /// Releases the bound target.
    pub fn clear(&mut self) {
        if let Some(resource) = self.target.as_mut() {
            resource.dispose();
        }
        self.attachment = 0;
    }

    #[must_use]
    pub fn target(&self) -> Option<ResourceKey> {
        self.target.as_ref().and_then(Resource::value)
    }

    #[must_use]
    pub fn texture(&self) -> Option<TextureRef> {
        self.target().map(|key| TextureRef::new(key, self.attachment))
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.target().is_some()
    }
}

/// What a pass reads.
#[derive(Debug)]
pub struct Input {
    required: GBufferComponents,
    uses_default: bool,
    precision: Option<Precision>,
    /// Output of the previous pass.
    pub(crate) default: TextureBinding,
    /// G-Buffer channels, bound to the primary G-Buffer target.
    pub(crate) buffers: FxHashMap<GBufferComponents, TextureBinding>,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            required: GBufferComponents::empty(),
            uses_default: true,
            precision: None,
            default: TextureBinding::default(),
            buffers: FxHashMap::default(),
        }
    }
}

impl Input {
    /// G-Buffer channels this pass samples.
    #[inline]
    #[must_use]
    pub fn required_components(&self) -> GBufferComponents {
        self.required
    }

    /// `false` when the pass does not read the previous pass's output.
    #[inline]
    #[must_use]
    pub fn uses_default(&self) -> bool {
        self.uses_default
    }

    /// Precision this pass wants its default input stored at.
    #[inline]
    #[must_use]
    pub fn precision(&self) -> Option<Precision> {
        self.precision
    }

    #[must_use]
    pub fn default_texture(&self) -> Option<TextureRef> {
        self.default.texture()
    }

    #[must_use]
    pub fn buffer(&self, component: GBufferComponents) -> Option<TextureRef> {
        self.buffers.get(&component).and_then(TextureBinding::texture)
    }

    /// Every bound G-Buffer channel, in bit order.
    #[must_use]
    pub fn bound_buffers(&self) -> Vec<(GBufferComponents, TextureRef)> {
        let mut bound: Vec<_> = self
            .buffers
            .iter()
            .filter_map(|(&c, b)| b.texture().map(|t| (c, t)))
            .collect();
        bound.sort_by_key(|(c, _)| c.bits());
        bound
    }

    pub(crate) fn clear(&mut self) {
        self.default.clear();
        for binding in self.buffers.values_mut() {
            binding.clear();
        }
        self.buffers.clear();
    }
}

/// What a pass writes.
#[derive(Debug, Default)]
pub struct Output {
    /// Empty means the screen.
    pub(crate) default: TextureBinding,
    pub(crate) gbuffer_layout: Option<GBufferLayout>,
}

impl Output {
    #[must_use]
    pub fn default_texture(&self) -> Option<TextureRef> {
        self.default.texture()
    }

    #[must_use]
    pub fn renders_to_screen(&self) -> bool {
        !self.default.is_bound()
    }

    /// Channel indices of the G-Buffer this pass writes, for geometry passes.
    #[must_use]
    pub fn gbuffer_layout(&self) -> Option<&GBufferLayout> {
        self.gbuffer_layout.as_ref()
    }

    #[must_use]
    pub fn draw_target(&self) -> DrawTarget {
        self.default
            .target()
            .map_or(DrawTarget::Screen, DrawTarget::Texture)
    }

    pub(crate) fn clear(&mut self) {
        self.default.clear();
        self.gbuffer_layout = None;
    }
}

/// State shared by every pass.
#[derive(Debug)]
pub struct PassBase {
    id: PassId,
    name: String,
    enabled: bool,
    pub(crate) input: Input,
    pub(crate) output: Output,
    topology: ChangeTracker,
}

impl PassBase {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PassId::next(),
            name: name.into(),
            enabled: true,
            input: Input::default(),
            output: Output::default(),
            topology: ChangeTracker::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PassId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn input(&self) -> &Input {
        &self.input
    }

    #[inline]
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Bumped whenever buffer wiring must be recomputed.
    #[inline]
    #[must_use]
    pub fn topology_version(&self) -> u64 {
        self.topology.version()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.topology.changed();
        }
    }

    pub fn set_required_components(&mut self, components: GBufferComponents) {
        if self.input.required != components {
            self.input.required = components;
            self.topology.changed();
        }
    }

    pub fn set_uses_default_input(&mut self, uses_default: bool) {
        if self.input.uses_default != uses_default {
            self.input.uses_default = uses_default;
            self.topology.changed();
        }
    }

    pub fn set_input_precision(&mut self, precision: Option<Precision>) {
        if self.input.precision != precision {
            self.input.precision = precision;
            self.topology.changed();
        }
    }
}

/// Per-frame state handed to [`Pass::prepare`] and [`Pass::render`].
pub struct FrameContext<'a> {
    pub device: &'a mut dyn RenderDevice,
    pub registry: &'a SharedRegistry<RenderTarget>,
    pub settings: &'a PipelineSettings,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since the pipeline started rendering.
    pub elapsed: f32,
    pub size: (u32, u32),
}

impl FrameContext<'_> {
    /// Device limits, falling back to the configured ones when the device
    /// reports zeros.
    #[must_use]
    pub fn limits(&self) -> DeviceLimits {
        let limits = self.device.limits();
        if limits.max_fragment_uniforms == 0 || limits.max_varyings == 0 {
            self.settings.fallback_limits
        } else {
            limits
        }
    }
}

/// A stage of the render pipeline.
pub trait Pass: Any {
    fn base(&self) -> &PassBase;

    fn base_mut(&mut self) -> &mut PassBase;

    fn kind(&self) -> PassKind {
        PassKind::Other
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Called once per frame before any pass renders. A pass that returns an
    /// error is expected to have disabled itself.
    fn prepare(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), PassError> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>);

    /// Called by the resolver with the layout of the primary G-Buffer.
    fn set_gbuffer_layout(&mut self, _layout: &GBufferLayout) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

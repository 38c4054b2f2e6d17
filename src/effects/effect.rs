//! Effect Definition
//!
//! An [`Effect`] is a self-contained image modification: GLSL fragments, a
//! blend mode, capability flags and the G-Buffer channels it samples.
//!
//! The fragment shader may declare
//! - `void mainImage(const in vec4 inputColor, const in vec2 uv, [const in float depth,] out vec4 outputColor)`
//! - `void mainUv(inout vec2 uv)`
//!
//! and the vertex shader may declare `void mainSupport([const in vec2 uv])`.
//! Anything else in the text (helpers, uniforms, varyings) is the effect's
//! head section and is namespaced before merging.
//!
//! # Change notifications
//!
//! | Setter                     | Tracker   | Consequence                     |
//! |----------------------------|-----------|---------------------------------|
//! | `set_enabled`              | toggle    | material key changes            |
//! | `set_optional`             | toggle    | pre-built combinations change   |
//! | `set_opacity`, `set_uniform` (existing) | none | live uniform value        |
//! | shaders, defines, blend fn, attributes, new uniforms | shader | full cache rebuild |

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

use super::blend::{BlendFunction, BlendMode};
use crate::resources::{ChangeTracker, GBufferComponents, ShaderData, UniformValue};

static NEXT_EFFECT_ID: AtomicU32 = AtomicU32::new(1);

/// Stable numeric identity of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u32);

impl EffectId {
    fn next() -> Self {
        Self(NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Capabilities an effect requires from the merged program.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct EffectAttributes: u32 {
        /// Reads scene depth.
        const DEPTH       = 1 << 0;
        /// Samples neighbouring texels of the input (multi-sample); at most one
        /// per merged program.
        const CONVOLUTION = 1 << 1;
    }
}

#[derive(Debug, Clone)]
pub struct Effect {
    id: EffectId,
    name: String,
    enabled: bool,
    optional: bool,
    blend_mode: BlendMode,
    attributes: EffectAttributes,
    gbuffer_reads: GBufferComponents,
    fragment_shader: Option<String>,
    vertex_shader: Option<String>,
    data: ShaderData,
    shader_tracker: ChangeTracker,
    toggle_tracker: ChangeTracker,
}

impl Effect {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EffectId::next(),
            name: name.into(),
            enabled: true,
            optional: false,
            blend_mode: BlendMode::default(),
            attributes: EffectAttributes::empty(),
            gbuffer_reads: GBufferComponents::empty(),
            fragment_shader: None,
            vertex_shader: None,
            data: ShaderData::new(),
            shader_tracker: ChangeTracker::new(),
            toggle_tracker: ChangeTracker::new(),
        }
    }

    // ---- Builder ----

    #[must_use]
    pub fn with_fragment_shader(mut self, source: impl Into<String>) -> Self {
        self.fragment_shader = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_vertex_shader(mut self, source: impl Into<String>) -> Self {
        self.vertex_shader = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    #[must_use]
    pub fn with_blend_function(mut self, function: BlendFunction) -> Self {
        self.blend_mode.function = function;
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: EffectAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_gbuffer_reads(mut self, components: GBufferComponents) -> Self {
        self.gbuffer_reads = components;
        self
    }

    #[must_use]
    pub fn with_define(mut self, key: &str, value: &str) -> Self {
        self.data.defines.set(key, value);
        self
    }

    #[must_use]
    pub fn with_uniform(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.data.uniforms.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    // ---- Accessors ----

    #[inline]
    #[must_use]
    pub fn id(&self) -> EffectId {
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
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[inline]
    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// `true` when the blend function is [`BlendFunction::Skip`].
    #[inline]
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.blend_mode.function.is_skip()
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> EffectAttributes {
        self.attributes
    }

    /// G-Buffer channels the owning pass must receive. Depth-reading effects
    /// always request the depth channel.
    #[must_use]
    pub fn required_components(&self) -> GBufferComponents {
        let mut components = self.gbuffer_reads;
        if self.attributes.contains(EffectAttributes::DEPTH) {
            components |= GBufferComponents::DEPTH;
        }
        components
    }

    #[must_use]
    pub fn fragment_shader(&self) -> Option<&str> {
        self.fragment_shader.as_deref()
    }

    #[must_use]
    pub fn vertex_shader(&self) -> Option<&str> {
        self.vertex_shader.as_deref()
    }

    #[must_use]
    pub fn shader_data(&self) -> &ShaderData {
        &self.data
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.data.uniform(name)
    }

    /// Version bumped whenever the generated text would change.
    #[inline]
    #[must_use]
    pub fn shader_version(&self) -> u64 {
        self.shader_tracker.version()
    }

    /// Version bumped on enable/optional toggles.
    #[inline]
    #[must_use]
    pub fn toggle_version(&self) -> u64 {
        self.toggle_tracker.version()
    }

    // ---- Mutation ----

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.toggle_tracker.changed();
        }
    }

    pub fn set_optional(&mut self, optional: bool) {
        if self.optional != optional {
            self.optional = optional;
            self.toggle_tracker.changed();
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.blend_mode.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_blend_function(&mut self, function: BlendFunction) {
        if self.blend_mode.function != function {
            self.blend_mode.function = function;
            self.shader_tracker.changed();
        }
    }

    pub fn set_attributes(&mut self, attributes: EffectAttributes) {
        if self.attributes != attributes {
            self.attributes = attributes;
            self.shader_tracker.changed();
        }
    }

    pub fn set_gbuffer_reads(&mut self, components: GBufferComponents) {
        if self.gbuffer_reads != components {
            self.gbuffer_reads = components;
            self.shader_tracker.changed();
        }
    }

    pub fn set_fragment_shader(&mut self, source: impl Into<String>) {
        self.fragment_shader = Some(source.into());
        self.shader_tracker.changed();
    }

    pub fn set_vertex_shader(&mut self, source: Option<String>) {
        self.vertex_shader = source;
        self.shader_tracker.changed();
    }

    pub fn set_define(&mut self, key: &str, value: &str) {
        if self.data.defines.get(key) != Some(value) {
            self.data.defines.set(key, value);
            self.shader_tracker.changed();
        }
    }

    pub fn remove_define(&mut self, key: &str) {
        if self.data.defines.remove(key) {
            self.shader_tracker.changed();
        }
    }

    /// Updates a uniform value. Introducing a new uniform name changes the
    /// generated program; updating an existing one does not.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let is_new = self
            .data
            .uniforms
            .insert(name.to_string(), value.into())
            .is_none();
        if is_new {
            self.shader_tracker.changed();
        }
    }

    /// Forces consumers to rebuild every material containing this effect.
    pub fn mark_shader_changed(&mut self) {
        self.shader_tracker.changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Effect::new("a");
        let b = Effect::new("b");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn toggles_do_not_bump_shader_version() {
        let mut effect = Effect::new("vignette");
        effect.set_enabled(false);
        effect.set_optional(true);
        effect.set_opacity(0.5);

        assert_eq!(effect.shader_version(), 0);
        assert_eq!(effect.toggle_version(), 2);
    }

    #[test]
    fn new_uniform_bumps_shader_version_but_update_does_not() {
        let mut effect = Effect::new("tint").with_uniform("strength", 1.0_f32);
        effect.set_uniform("strength", 0.25_f32);
        assert_eq!(effect.shader_version(), 0);

        effect.set_uniform("radius", 2.0_f32);
        assert_eq!(effect.shader_version(), 1);
    }

    #[test]
    fn depth_attribute_requests_depth_channel() {
        let effect = Effect::new("fog")
            .with_attributes(EffectAttributes::DEPTH)
            .with_gbuffer_reads(GBufferComponents::NORMAL);
        assert_eq!(
            effect.required_components(),
            GBufferComponents::NORMAL | GBufferComponents::DEPTH
        );
    }

    #[test]
    fn program_setters_bump_shader_version() {
        let mut effect = Effect::new("grade").with_define("LUT_SIZE", "32");

        effect.set_blend_function(BlendFunction::Screen);
        effect.set_attributes(EffectAttributes::CONVOLUTION);
        effect.set_gbuffer_reads(GBufferComponents::NORMAL);
        effect.set_vertex_shader(Some("void mainSupport() {}".into()));
        effect.remove_define("LUT_SIZE");
        effect.remove_define("LUT_SIZE");
        effect.mark_shader_changed();

        assert_eq!(effect.shader_version(), 6);
        assert_eq!(effect.blend_mode().function, BlendFunction::Screen);
        assert!(effect.shader_data().defines.is_empty());
    }
}

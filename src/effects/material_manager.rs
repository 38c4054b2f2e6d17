//! Effect Material Manager
//!
//! Owns the material cache of one effect pass. Each distinct set of enabled
//! effects maps to exactly one [`EffectMaterial`]:
//!
//! ```text
//! effects ──► filter enabled, non-skip ──► priority sort ──► CombinationKey
//!                                                               │
//!                              cache hit ◄──────────────────────┤
//!                                                               ▼
//!                  integrate each effect ──► assemble ──► render templates
//! ```
//!
//! # Pre-building
//!
//! On a cache miss the manager also builds every combination reachable by
//! toggling the effects marked optional (a power set over at most
//! `max_prebuilt_optional` effects), so toggling them later never stalls on
//! shader generation.
//!
//! # Invalidation
//!
//! The whole cache is discarded when
//! - any effect's shader version moved,
//! - the G-Buffer layout changed (indices are baked into macros),
//! - dithering or input precision changed.
//!
//! Enabling or disabling an effect never invalidates anything; it only
//! selects a different key.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::effect::{Effect, EffectId};
use super::glsl;
use super::integration::EffectShaderData;
use super::material::{CombinationKey, EffectMaterial};
use super::shader_env::{self, FRAGMENT_TEMPLATE, VERTEX_TEMPLATE};
use super::shader_parts::Section;
use crate::device::DeviceLimits;
use crate::errors::Result;
use crate::resources::{GBufferComponents, GBufferLayout, Precision};

/// Uniforms every effect material declares besides the merged ones.
pub const BUILTIN_UNIFORM_COUNT: usize = 7;
/// Varyings every effect material declares besides the merged ones.
pub const BUILTIN_VARYING_COUNT: usize = 1;

/// Default ceiling for optional-effect pre-building.
pub const DEFAULT_MAX_PREBUILT_OPTIONAL: usize = 4;

/// Hard upper bound on the pre-build ceiling (2^16 combinations).
pub const MAX_PREBUILT_OPTIONAL_LIMIT: usize = 16;

#[derive(Serialize)]
struct TemplateContext<'a> {
    fragment_head: &'a str,
    fragment_main_uv: &'a str,
    fragment_main_image: &'a str,
    vertex_head: &'a str,
    vertex_main_support: &'a str,
    dithering: bool,
}

pub struct EffectMaterialManager {
    cache: FxHashMap<CombinationKey, Arc<EffectMaterial>>,
    shader_versions: FxHashMap<EffectId, u64>,
    gbuffer_layout: GBufferLayout,
    precision: Precision,
    dithering: bool,
    max_prebuilt_optional: usize,
    limits: DeviceLimits,
}

impl Default for EffectMaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectMaterialManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: FxHashMap::default(),
            shader_versions: FxHashMap::default(),
            gbuffer_layout: GBufferLayout::new(GBufferComponents::COLOR),
            precision: Precision::High,
            dithering: false,
            max_prebuilt_optional: DEFAULT_MAX_PREBUILT_OPTIONAL,
            limits: DeviceLimits::default(),
        }
    }

    /// Returns the material of the currently enabled combination of
    /// `effects`, building and caching it on first use.
    ///
    /// Errors describe why the requested combination cannot be merged; the
    /// cache is left as it was.
    pub fn get_material(&mut self, effects: &[Effect]) -> Result<Arc<EffectMaterial>> {
        self.sync_shader_versions(effects);

        let active = prioritized(effects.iter().filter(|e| e.is_enabled() && !e.is_skipped()));
        let key = combination_key(&active);

        if let Some(material) = self.cache.get(&key) {
            return Ok(Arc::clone(material));
        }

        let material = Arc::new(self.build(&active, key.clone())?);
        self.cache.insert(key, Arc::clone(&material));

        self.prebuild_optional(effects);

        Ok(material)
    }

    /// Builds every subset of the optional effects combined with the enabled
    /// required ones. Failures here are not fatal: a failing subset is simply
    /// not cached and surfaces when it is actually requested.
    fn prebuild_optional(&mut self, effects: &[Effect]) {
        let optional: Vec<EffectId> = effects
            .iter()
            .filter(|e| e.is_optional() && !e.is_skipped())
            .map(Effect::id)
            .collect();

        if optional.is_empty() {
            return;
        }
        if optional.len() > self.max_prebuilt_optional {
            log::debug!(
                "{} optional effects exceed the pre-build ceiling of {}; building on demand",
                optional.len(),
                self.max_prebuilt_optional
            );
            return;
        }

        for mask in 0u32..(1u32 << optional.len()) {
            let subset = prioritized(effects.iter().filter(|e| {
                if e.is_skipped() {
                    return false;
                }
                match optional.iter().position(|&id| id == e.id()) {
                    Some(bit) => mask & (1 << bit) != 0,
                    None => e.is_enabled(),
                }
            }));

            let key = combination_key(&subset);
            if self.cache.contains_key(&key) {
                continue;
            }

            match self.build(&subset, key.clone()) {
                Ok(material) => {
                    self.cache.insert(key, Arc::new(material));
                }
                Err(e) => log::debug!("Skipped pre-building [{key}]: {e}"),
            }
        }
    }

    fn build(&self, effects: &[&Effect], key: CombinationKey) -> Result<EffectMaterial> {
        let mut data = EffectShaderData::new();
        for (i, effect) in effects.iter().enumerate() {
            data.integrate_effect(&format!("e{i}"), effect)?;
        }

        for function in data.blend_functions().to_vec() {
            if let Some(code) = function.shader_code() {
                let code = glsl::replace_word(&code, "blend", &function.function_name());
                let parts = data.parts_mut();
                parts.append(Section::FragmentHead, &code);
                parts.append(Section::FragmentHead, "\n");
            }
        }

        if data.reads_depth() {
            data.parts_mut()
                .prepend(Section::FragmentMainImage, "float depth = readDepth(UV);\n\n\t");
        }

        let mut defines = data.defines().clone();
        if data.transforms_uv() {
            data.parts_mut()
                .prepend(Section::FragmentMainUv, "vec2 transformedUv = vUv;\n");
            defines.set("UV", "transformedUv");
        } else {
            defines.set("UV", "vUv");
        }
        defines.merge(&self.gbuffer_layout.defines());
        if self.precision == Precision::High {
            defines.set("FRAMEBUFFER_PRECISION_HIGH", "1");
        }

        let parts = data.parts_mut();
        parts.finalize();

        let context = TemplateContext {
            fragment_head: parts.get(Section::FragmentHead),
            fragment_main_uv: parts.get(Section::FragmentMainUv),
            fragment_main_image: parts.get(Section::FragmentMainImage),
            vertex_head: parts.get(Section::VertexHead),
            vertex_main_support: parts.get(Section::VertexMainSupport),
            dithering: self.dithering,
        };
        let fragment_shader = shader_env::render(FRAGMENT_TEMPLATE, &context)?;
        let vertex_shader = shader_env::render(VERTEX_TEMPLATE, &context)?;

        self.check_limits(&key, &data);

        let source_hash =
            EffectMaterial::compute_source_hash(&fragment_shader, &vertex_shader, &defines);

        log::debug!("Built effect material [{key}] ({} effects)", effects.len());

        Ok(EffectMaterial {
            key,
            fragment_shader,
            vertex_shader,
            defines,
            uniforms: data.uniforms().clone(),
            varyings: data.varyings().to_vec(),
            attributes: data.attributes(),
            transforms_uv: data.transforms_uv(),
            reads_depth: data.reads_depth(),
            dithering: self.dithering,
            source_hash,
        })
    }

    fn check_limits(&self, key: &CombinationKey, data: &EffectShaderData) {
        let uniforms = data.uniforms().len() + BUILTIN_UNIFORM_COUNT;
        if uniforms > self.limits.max_fragment_uniforms {
            log::warn!(
                "Effect material [{key}] uses {uniforms} uniforms, more than the device limit of {}",
                self.limits.max_fragment_uniforms
            );
        }

        let varyings = data.varyings().len() + BUILTIN_VARYING_COUNT;
        if varyings > self.limits.max_varyings {
            log::warn!(
                "Effect material [{key}] uses {varyings} varyings, more than the device limit of {}",
                self.limits.max_varyings
            );
        }
    }

    /// Clears the cache if any effect's shader version moved since the last
    /// call. Versions of effects absent from `effects` are kept: cached
    /// combinations may still contain them and they can be added back.
    fn sync_shader_versions(&mut self, effects: &[Effect]) {
        let mut changed = false;
        for effect in effects {
            let version = effect.shader_version();
            if let Some(previous) = self.shader_versions.insert(effect.id(), version) {
                changed |= previous != version;
            }
        }

        if changed {
            log::debug!("Effect shader changed; discarding {} materials", self.cache.len());
            self.cache.clear();
        }
    }

    // ---- Configuration ----

    pub fn set_gbuffer_layout(&mut self, layout: &GBufferLayout) {
        if &self.gbuffer_layout != layout {
            self.gbuffer_layout = layout.clone();
            self.cache.clear();
        }
    }

    #[must_use]
    pub fn gbuffer_layout(&self) -> &GBufferLayout {
        &self.gbuffer_layout
    }

    pub fn set_dithering(&mut self, dithering: bool) {
        if self.dithering != dithering {
            self.dithering = dithering;
            self.cache.clear();
        }
    }

    pub fn set_precision(&mut self, precision: Precision) {
        if self.precision != precision {
            self.precision = precision;
            self.cache.clear();
        }
    }

    pub fn set_limits(&mut self, limits: DeviceLimits) {
        self.limits = limits;
    }

    /// Sets the optional-effect ceiling for power-set pre-building, clamped to
    /// [`MAX_PREBUILT_OPTIONAL_LIMIT`].
    pub fn set_max_prebuilt_optional(&mut self, max: usize) {
        if max > MAX_PREBUILT_OPTIONAL_LIMIT {
            log::warn!(
                "Pre-build ceiling {max} clamped to {MAX_PREBUILT_OPTIONAL_LIMIT} optional effects"
            );
        }
        self.max_prebuilt_optional = max.min(MAX_PREBUILT_OPTIONAL_LIMIT);
    }

    #[must_use]
    pub fn max_prebuilt_optional(&self) -> usize {
        self.max_prebuilt_optional
    }

    // ---- Inspection ----

    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn contains(&self, key: &CombinationKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Cached materials in no particular order.
    pub fn materials(&self) -> impl Iterator<Item = &Arc<EffectMaterial>> {
        self.cache.values()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Stable sort by attribute bits, highest first: convolution+depth,
/// convolution, depth, none.
fn prioritized<'a>(effects: impl Iterator<Item = &'a Effect>) -> Vec<&'a Effect> {
    let mut sorted: Vec<&Effect> = effects.collect();
    sorted.sort_by(|a, b| b.attributes().bits().cmp(&a.attributes().bits()));
    sorted
}

fn combination_key(effects: &[&Effect]) -> CombinationKey {
    CombinationKey::new(effects.iter().map(|e| e.id()))
}

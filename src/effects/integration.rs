//! Effect Symbol Integration
//!
//! [`EffectShaderData`] accumulates the shader text of several effects into
//! one set of [`ShaderParts`]. Every function, macro, varying and uniform an
//! effect declares is renamed with a per-effect prefix (`e0`, `e1`, ...) so
//! effects authored in isolation can share a program:
//!
//! ```text
//! float adjust(vec3 c) { ... }        ->  float e0Adjust(vec3 c) { ... }
//! uniform float strength;             ->  uniform float e0Strength;
//! color.rgb                           ->  color.rgb   (member access kept)
//! ```
//!
//! The entry points become calls in the main sections:
//!
//! | Entry point    | Section               | Emitted call                              |
//! |----------------|-----------------------|-------------------------------------------|
//! | `mainImage`    | `FragmentMainImage`   | `e0MainImage(color0, UV, [depth, ]color1)` + blend |
//! | `mainUv`       | `FragmentMainUv`      | `e0MainUv(UV)`                            |
//! | `mainSupport`  | `VertexMainSupport`   | `e0MainSupport([vUv])`                    |

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::blend::BlendFunction;
use super::effect::{Effect, EffectAttributes, EffectId};
use super::glsl;
use super::shader_parts::{Section, ShaderParts};
use crate::errors::EffectError;
use crate::resources::ShaderDefines;
use crate::resources::shader_defines::macro_name;

/// Where the value of a merged uniform comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniformBinding {
    /// A uniform of the effect's own table, by its original name.
    Effect { effect: EffectId, name: String },
    /// The blend opacity of an effect.
    BlendOpacity(EffectId),
}

/// What one call to [`EffectShaderData::integrate_effect`] contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationResult {
    pub transforms_uv: bool,
    pub reads_depth: bool,
    /// Renamed varyings declared by the effect.
    pub varyings: Vec<String>,
}

/// Merged shader state of an effect combination under construction.
#[derive(Debug, Clone, Default)]
pub struct EffectShaderData {
    parts: ShaderParts,
    blend_functions: SmallVec<[BlendFunction; 4]>,
    defines: ShaderDefines,
    uniforms: BTreeMap<String, UniformBinding>,
    attributes: EffectAttributes,
    varyings: Vec<String>,
    transforms_uv: bool,
    reads_depth: bool,
    convolution_owner: Option<String>,
    uv_transformer: Option<String>,
}

impl EffectShaderData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the symbols of `effect` with `prefix` and appends its text and
    /// entry-point calls to the shared sections.
    ///
    /// Nothing is modified when an error is returned.
    pub fn integrate_effect(
        &mut self,
        prefix: &str,
        effect: &Effect,
    ) -> Result<IntegrationResult, EffectError> {
        if effect.is_skipped() {
            return Ok(IntegrationResult::default());
        }

        let fragment = effect.fragment_shader().unwrap_or_default();
        let main_image = glsl::function_params(fragment, "mainImage");
        let main_uv = glsl::function_params(fragment, "mainUv").is_some();

        if main_image.is_none() && !main_uv {
            return Err(EffectError::MissingEntryPoint {
                name: effect.name().to_string(),
                id: effect.id(),
            });
        }

        let attributes = effect.attributes();
        let convolution = attributes.contains(EffectAttributes::CONVOLUTION);
        self.check_compatibility(effect, convolution, main_uv)?;

        let vertex = effect.vertex_shader().unwrap_or_default();
        let main_support = glsl::function_params(vertex, "mainSupport");

        let renames = collect_symbols(prefix, effect, fragment, vertex);
        let rename = |src: &str| glsl::rename_symbols(src, &renames);

        let mut result = IntegrationResult::default();

        if let Some(params) = main_image {
            let function = effect.blend_mode().function;
            let opacity = glsl::prefixed(prefix, "blendOpacity");
            let reads_depth =
                attributes.contains(EffectAttributes::DEPTH) && glsl::params_contain(params, "depth");
            let args = if reads_depth {
                "color0, UV, depth, color1"
            } else {
                "color0, UV, color1"
            };

            self.parts.append(
                Section::FragmentMainImage,
                &format!(
                    "{}({args});\n\tcolor0 = {}(color0, color1, {opacity});\n\n\t",
                    glsl::prefixed(prefix, "mainImage"),
                    function.function_name(),
                ),
            );
            self.parts
                .append(Section::FragmentHead, &format!("uniform float {opacity};\n\n"));
            self.uniforms
                .insert(opacity, UniformBinding::BlendOpacity(effect.id()));

            if !self.blend_functions.contains(&function) {
                self.blend_functions.push(function);
            }
            result.reads_depth = reads_depth;
        }

        self.parts.append(Section::FragmentHead, &rename(fragment));
        self.parts.append(Section::FragmentHead, "\n");

        if main_uv {
            self.parts.append(
                Section::FragmentMainUv,
                &format!("\t{}(UV);\n", glsl::prefixed(prefix, "mainUv")),
            );
            result.transforms_uv = true;
        }

        if let Some(params) = main_support {
            let arg = if glsl::params_contain(params, "uv") { "vUv" } else { "" };
            self.parts.append(
                Section::VertexMainSupport,
                &format!("\t{}({arg});\n", glsl::prefixed(prefix, "mainSupport")),
            );
            self.parts.append(Section::VertexHead, &rename(vertex));
            self.parts.append(Section::VertexHead, "\n");
        } else if !vertex.is_empty() {
            log::warn!(
                "Effect '{}' has a vertex shader without mainSupport; ignored",
                effect.name()
            );
        }

        let data = effect.shader_data();
        let defines = data.defines.map_entries(|k, v| (rename(k), rename(v)));
        self.defines.merge(&defines);

        for name in data.uniforms.keys() {
            self.uniforms.insert(
                glsl::prefixed(prefix, name),
                UniformBinding::Effect {
                    effect: effect.id(),
                    name: name.clone(),
                },
            );
        }

        // Varyings appear in both stages; keep the first declaration only.
        let mut seen = FxHashSet::default();
        let varyings: Vec<String> = glsl::find_varyings(fragment)
            .into_iter()
            .chain(glsl::find_varyings(vertex))
            .filter(|v| seen.insert(*v))
            .map(|v| glsl::prefixed(prefix, v))
            .collect();
        self.varyings.extend(varyings.iter().cloned());
        result.varyings = varyings;

        self.attributes |= attributes;
        self.transforms_uv |= result.transforms_uv;
        self.reads_depth |= result.reads_depth;
        if convolution {
            self.convolution_owner = Some(effect.name().to_string());
        }
        if main_uv && self.uv_transformer.is_none() {
            self.uv_transformer = Some(effect.name().to_string());
        }

        Ok(result)
    }

    fn check_compatibility(
        &self,
        effect: &Effect,
        convolution: bool,
        main_uv: bool,
    ) -> Result<(), EffectError> {
        if convolution && let Some(first) = &self.convolution_owner {
            return Err(EffectError::ConvolutionClash {
                first: first.clone(),
                second: effect.name().to_string(),
            });
        }
        if main_uv && (convolution || self.convolution_owner.is_some()) {
            return Err(EffectError::UvTransformWithConvolution {
                name: effect.name().to_string(),
            });
        }
        if convolution && let Some(transformer) = &self.uv_transformer {
            return Err(EffectError::UvTransformWithConvolution {
                name: transformer.clone(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn parts(&self) -> &ShaderParts {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut ShaderParts {
        &mut self.parts
    }

    /// Blend functions used so far, in first-seen order.
    #[must_use]
    pub fn blend_functions(&self) -> &[BlendFunction] {
        &self.blend_functions
    }

    #[must_use]
    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    #[must_use]
    pub fn uniforms(&self) -> &BTreeMap<String, UniformBinding> {
        &self.uniforms
    }

    #[must_use]
    pub fn attributes(&self) -> EffectAttributes {
        self.attributes
    }

    #[must_use]
    pub fn varyings(&self) -> &[String] {
        &self.varyings
    }

    #[must_use]
    pub fn transforms_uv(&self) -> bool {
        self.transforms_uv
    }

    #[must_use]
    pub fn reads_depth(&self) -> bool {
        self.reads_depth
    }
}

/// Maps every symbol `effect` declares to its prefixed name.
fn collect_symbols(
    prefix: &str,
    effect: &Effect,
    fragment: &str,
    vertex: &str,
) -> FxHashMap<String, String> {
    let data = effect.shader_data();

    let names = glsl::find_functions(fragment)
        .into_iter()
        .chain(glsl::find_functions(vertex))
        .chain(glsl::find_varyings(fragment))
        .chain(glsl::find_varyings(vertex))
        .chain(glsl::find_macro_definitions(fragment))
        .chain(glsl::find_macro_definitions(vertex))
        .chain(data.defines.iter().map(|(k, _)| macro_name(k)))
        .chain(data.uniforms.keys().map(String::as_str));

    names
        .map(|name| (name.to_string(), glsl::prefixed(prefix, name)))
        .collect()
}

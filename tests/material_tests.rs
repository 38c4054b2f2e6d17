//! Effect Material Tests
//!
//! Tests for:
//! - Combination keys: consistency across calls, toggle/remove equivalence
//! - Material cache: invalidation on shader and configuration changes
//! - Symbol integration: collision freedom, single emission of shared code
//! - Optional-effect pre-building: power set and ceiling
//! - Device limits: warnings only
//! - Merge errors: convolution clash, UV transform with convolution

mod common;

use std::sync::Arc;

use prism::effects::{
    BlendFunction, BlendMode, Effect, EffectAttributes, EffectMaterialManager, EffectShaderData,
    UniformBinding,
};
use prism::resources::GBufferComponents;
use prism::{DeviceLimits, EffectError, Precision, PrismError};

use common::{color_effect, convolution_effect, depth_effect, init_logger, uv_effect};

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ============================================================================
// Combination Keys
// ============================================================================

#[test]
fn same_combination_returns_same_material() {
    let mut manager = EffectMaterialManager::new();
    let effects = vec![color_effect("tint"), depth_effect("fog")];

    let first = manager.get_material(&effects).unwrap();
    let second = manager.get_material(&effects).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(manager.cached_count(), 1);
}

#[test]
fn key_follows_priority_order() {
    let mut manager = EffectMaterialManager::new();
    let tint = color_effect("tint");
    let fog = depth_effect("fog");
    let (tint_id, fog_id) = (tint.id(), fog.id());

    let material = manager.get_material(&[tint, fog]).unwrap();

    // Depth effects sort ahead of plain ones.
    assert_eq!(material.key().ids(), &[fog_id, tint_id]);
}

#[test]
fn disabled_effect_matches_removed_effect() {
    let mut toggled = EffectMaterialManager::new();
    let mut removed = EffectMaterialManager::new();

    let tint = color_effect("tint");
    let mut fog = depth_effect("fog");
    fog.set_enabled(false);

    let with_disabled = toggled.get_material(&[tint.clone(), fog]).unwrap();
    let without = removed.get_material(&[tint]).unwrap();

    assert_eq!(with_disabled.key(), without.key());
    assert_eq!(with_disabled.source_hash(), without.source_hash());
    assert_eq!(with_disabled.fragment_shader(), without.fragment_shader());
}

#[test]
fn toggling_does_not_invalidate_cache() {
    let mut manager = EffectMaterialManager::new();
    let mut effects = vec![color_effect("tint"), color_effect("grade")];

    let both = manager.get_material(&effects).unwrap();
    effects[1].set_enabled(false);
    let one = manager.get_material(&effects).unwrap();
    effects[1].set_enabled(true);
    let both_again = manager.get_material(&effects).unwrap();

    assert!(!Arc::ptr_eq(&both, &one));
    assert!(Arc::ptr_eq(&both, &both_again));
    assert_eq!(manager.cached_count(), 2);
}

#[test]
fn skipped_effect_is_left_out_of_key() {
    let mut manager = EffectMaterialManager::new();
    let tint = color_effect("tint");
    let hidden = color_effect("hidden").with_blend_function(BlendFunction::Skip);
    let tint_id = tint.id();

    let material = manager.get_material(&[tint, hidden]).unwrap();

    assert_eq!(material.key().ids(), &[tint_id]);
    assert_eq!(count(material.fragment_shader(), "MainImage("), 2);
}

#[test]
fn only_skipped_effects_give_passthrough() {
    let mut manager = EffectMaterialManager::new();
    let hidden = color_effect("hidden").with_blend_function(BlendFunction::Skip);

    let material = manager.get_material(&[hidden]).unwrap();
    assert!(material.is_passthrough());
}

// ============================================================================
// Invalidation
// ============================================================================

#[test]
fn shader_change_invalidates_cache() {
    let mut manager = EffectMaterialManager::new();
    let mut effects = vec![color_effect("tint")];

    let before = manager.get_material(&effects).unwrap();
    effects[0].set_fragment_shader(
        "void mainImage(const in vec4 inputColor, const in vec2 uv, out vec4 outputColor) {\n\
         \toutputColor = inputColor.bgra;\n\
         }\n",
    );
    let after = manager.get_material(&effects).unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_ne!(before.source_hash(), after.source_hash());
    assert!(after.fragment_shader().contains("inputColor.bgra"));
    assert_eq!(manager.cached_count(), 1);
}

#[test]
fn shader_change_while_removed_invalidates_on_return() {
    let mut manager = EffectMaterialManager::new();
    let tint = color_effect("tint");
    let mut grade = color_effect("grade");

    manager.get_material(&[tint.clone(), grade.clone()]).unwrap();
    manager.get_material(std::slice::from_ref(&tint)).unwrap();

    grade.set_fragment_shader(
        "void mainImage(const in vec4 inputColor, const in vec2 uv, out vec4 outputColor) {\n\
         \toutputColor = inputColor.gbra;\n\
         }\n",
    );
    let material = manager.get_material(&[tint, grade]).unwrap();

    assert!(material.fragment_shader().contains("inputColor.gbra"));
}

#[test]
fn define_change_invalidates_cache() {
    let mut manager = EffectMaterialManager::new();
    let mut effects = vec![color_effect("tint").with_define("SAMPLES", "4")];

    let before = manager.get_material(&effects).unwrap();
    effects[0].set_define("SAMPLES", "8");
    let after = manager.get_material(&effects).unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.defines().get("e0SAMPLES"), Some("8"));
}

#[test]
fn opacity_change_keeps_material() {
    let mut manager = EffectMaterialManager::new();
    let mut effects = vec![color_effect("tint")];

    let before = manager.get_material(&effects).unwrap();
    effects[0].set_opacity(0.25);
    let after = manager.get_material(&effects).unwrap();

    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn precision_and_dithering_are_baked_in() {
    let mut manager = EffectMaterialManager::new();
    let effects = vec![color_effect("tint")];

    let high = manager.get_material(&effects).unwrap();
    assert_eq!(high.defines().get("FRAMEBUFFER_PRECISION_HIGH"), Some("1"));
    assert!(!high.fragment_shader().contains("ditherNoise"));

    manager.set_precision(Precision::Low);
    manager.set_dithering(true);
    let low = manager.get_material(&effects).unwrap();

    assert!(!low.defines().contains("FRAMEBUFFER_PRECISION_HIGH"));
    assert!(low.dithering());
    assert!(low.fragment_shader().contains("ditherNoise"));
    assert_ne!(high.source_hash(), low.source_hash());
}

// ============================================================================
// Symbol Integration
// ============================================================================

#[test]
fn identical_effects_do_not_collide() {
    let mut manager = EffectMaterialManager::new();
    let effects = vec![color_effect("a"), color_effect("b")];

    let material = manager.get_material(&effects).unwrap();
    let fragment = material.fragment_shader();

    assert!(fragment.contains("vec3 e0Adjust("));
    assert!(fragment.contains("vec3 e1Adjust("));
    assert!(fragment.contains("uniform float e0Strength;"));
    assert!(fragment.contains("uniform float e1Strength;"));
    assert!(!fragment.contains("vec3 adjust("));
    assert!(fragment.contains("e0MainImage(color0, UV, color1);"));
    assert!(fragment.contains("e1MainImage(color0, UV, color1);"));
    // Member accesses are never renamed.
    assert!(fragment.contains("inputColor.rgb"));
}

#[test]
fn merged_uniforms_point_back_to_their_effects() {
    let mut manager = EffectMaterialManager::new();
    let a = color_effect("a");
    let b = color_effect("b");
    let (a_id, b_id) = (a.id(), b.id());

    let material = manager.get_material(&[a, b]).unwrap();
    let uniforms = material.uniforms();

    assert_eq!(
        uniforms.get("e0Strength"),
        Some(&UniformBinding::Effect {
            effect: a_id,
            name: "strength".into()
        })
    );
    assert_eq!(
        uniforms.get("e1BlendOpacity"),
        Some(&UniformBinding::BlendOpacity(b_id))
    );
}

#[test]
fn shared_blend_function_emitted_once() {
    let mut manager = EffectMaterialManager::new();
    let effects = vec![
        color_effect("a"),
        color_effect("b"),
        color_effect("c").with_blend_mode(BlendMode::new(BlendFunction::Screen)),
    ];

    let material = manager.get_material(&effects).unwrap();
    let fragment = material.fragment_shader();

    assert_eq!(count(fragment, "vec4 blendNormal("), 1);
    assert_eq!(count(fragment, "vec4 blendScreen("), 1);
    assert_eq!(count(fragment, "= blendNormal(color0, color1"), 2);
    assert_eq!(count(fragment, "= blendScreen(color0, color1"), 1);
}

#[test]
fn depth_read_emitted_once() {
    let mut manager = EffectMaterialManager::new();
    let effects = vec![depth_effect("fog"), depth_effect("outline")];

    let material = manager.get_material(&effects).unwrap();
    let fragment = material.fragment_shader();

    assert!(material.reads_depth());
    assert_eq!(count(fragment, "float depth = readDepth(UV);"), 1);
    assert!(fragment.contains("e0MainImage(color0, UV, depth, color1);"));
    assert!(fragment.contains("e1MainImage(color0, UV, depth, color1);"));
}

#[test]
fn uv_transform_switches_uv_macro() {
    let mut manager = EffectMaterialManager::new();

    let plain = manager.get_material(&[color_effect("tint")]).unwrap();
    assert_eq!(plain.defines().get("UV"), Some("vUv"));

    let material = manager
        .get_material(&[uv_effect("zoom"), color_effect("tint")])
        .unwrap();
    assert!(material.transforms_uv());
    assert_eq!(material.defines().get("UV"), Some("transformedUv"));
    assert!(material.fragment_shader().contains("vec2 transformedUv = vUv;"));
    assert!(material.fragment_shader().contains("e0MainUv(UV);"));
    assert!(material.fragment_shader().contains("e1MainImage(color0, UV, color1);"));
}

#[test]
fn vertex_support_is_merged() {
    let mut manager = EffectMaterialManager::new();
    let effect = color_effect("shift").with_vertex_shader(
        "varying vec2 vOffset;\n\
         void mainSupport(const in vec2 uv) {\n\
         \tvOffset = uv * 2.0;\n\
         }\n",
    );

    let material = manager.get_material(&[effect]).unwrap();

    assert!(material.vertex_shader().contains("e0MainSupport(vUv);"));
    assert!(material.vertex_shader().contains("varying vec2 e0VOffset;"));
    assert_eq!(material.varyings(), &["e0VOffset".to_string()]);
}

#[test]
fn varyings_shared_by_both_stages_counted_once() {
    let effect = Effect::new("wave")
        .with_vertex_shader(
            "varying vec2 vA;\n\
             varying vec2 vB;\n\
             void mainSupport(const in vec2 uv) {\n\
             \tvA = uv;\n\
             \tvB = uv.yx;\n\
             }\n",
        )
        .with_fragment_shader(
            "varying vec2 vA;\n\
             varying vec2 vB;\n\
             void mainImage(const in vec4 inputColor, const in vec2 uv, out vec4 outputColor) {\n\
             \toutputColor = inputColor * vec4(vA, vB);\n\
             }\n",
        );

    let mut data = EffectShaderData::new();
    let result = data.integrate_effect("e0", &effect).unwrap();
    assert_eq!(result.varyings, vec!["e0VA".to_string(), "e0VB".to_string()]);

    let mut manager = EffectMaterialManager::new();
    let material = manager.get_material(&[effect]).unwrap();
    assert_eq!(material.varyings().len(), 2);
}

#[test]
fn skipped_depth_effect_leaves_material_attributes() {
    let mut manager = EffectMaterialManager::new();
    let hidden = depth_effect("fog").with_blend_function(BlendFunction::Skip);
    let effects = vec![color_effect("tint"), hidden];

    let material = manager.get_material(&effects).unwrap();

    assert!(!material.attributes().contains(EffectAttributes::DEPTH));
    assert!(!material.reads_depth());
    assert!(effects[1].required_components().contains(GBufferComponents::DEPTH));
}

// ============================================================================
// Pre-building
// ============================================================================

#[test]
fn optional_effects_prebuild_power_set() {
    init_logger();
    let mut manager = EffectMaterialManager::new();
    let effects = vec![
        color_effect("base"),
        color_effect("bloom").optional(),
        color_effect("grain").optional(),
    ];

    manager.get_material(&effects).unwrap();

    // {}, {bloom}, {grain}, {bloom, grain}, each combined with base.
    assert_eq!(manager.cached_count(), 4);
}

#[test]
fn toggling_prebuilt_optional_is_a_cache_hit() {
    let mut manager = EffectMaterialManager::new();
    let mut effects = vec![color_effect("base"), color_effect("bloom").optional()];

    manager.get_material(&effects).unwrap();
    let cached = manager.cached_count();

    effects[1].set_enabled(false);
    let material = manager.get_material(&effects).unwrap();

    assert_eq!(manager.cached_count(), cached);
    assert_eq!(material.key().len(), 1);
}

#[test]
fn prebuild_ceiling_falls_back_to_on_demand() {
    let mut manager = EffectMaterialManager::new();
    manager.set_max_prebuilt_optional(1);
    let effects = vec![
        color_effect("bloom").optional(),
        color_effect("grain").optional(),
    ];

    manager.get_material(&effects).unwrap();

    assert_eq!(manager.cached_count(), 1);
}

#[test]
fn failing_subset_is_not_prebuilt() {
    let mut manager = EffectMaterialManager::new();
    let mut blur = convolution_effect("blur").optional();
    blur.set_enabled(false);
    let effects = vec![convolution_effect("smaa"), blur];

    manager.get_material(&effects).unwrap();

    // The subset enabling both convolution effects cannot be merged.
    assert_eq!(manager.cached_count(), 1);
}

#[test]
fn prebuild_ceiling_is_clamped() {
    init_logger();
    let mut manager = EffectMaterialManager::new();
    manager.set_max_prebuilt_optional(64);
    assert_eq!(manager.max_prebuilt_optional(), 16);

    let effects: Vec<Effect> = (0..33)
        .map(|i| color_effect(&format!("layer{i}")).optional())
        .collect();
    let material = manager.get_material(&effects).unwrap();

    assert_eq!(material.key().len(), 33);
    assert_eq!(manager.cached_count(), 1);
}

// ============================================================================
// Device Limits
// ============================================================================

#[test]
fn exceeding_device_limits_only_warns() {
    init_logger();
    let mut manager = EffectMaterialManager::new();
    manager.set_limits(DeviceLimits {
        max_fragment_uniforms: 1,
        max_varyings: 0,
    });
    let effects = vec![color_effect("tint"), color_effect("grade")];

    let material = manager.get_material(&effects).unwrap();

    assert_eq!(material.uniforms().len(), 2);
    assert!(manager.contains(material.key()));
    assert_eq!(manager.cached_count(), 1);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn two_convolutions_are_rejected() {
    let mut manager = EffectMaterialManager::new();
    let effects = vec![convolution_effect("smaa"), convolution_effect("blur")];

    let err = manager.get_material(&effects).unwrap_err();

    assert!(matches!(
        err,
        PrismError::Effect(EffectError::ConvolutionClash { ref first, ref second })
            if first == "smaa" && second == "blur"
    ));
    assert_eq!(manager.cached_count(), 0);
}

#[test]
fn uv_transform_with_convolution_is_rejected() {
    let mut manager = EffectMaterialManager::new();

    let err = manager
        .get_material(&[uv_effect("zoom"), convolution_effect("blur")])
        .unwrap_err();

    assert!(matches!(
        err,
        PrismError::Effect(EffectError::UvTransformWithConvolution { ref name }) if name == "zoom"
    ));
}

#[test]
fn effect_without_entry_point_is_rejected() {
    let mut manager = EffectMaterialManager::new();
    let broken = Effect::new("broken").with_fragment_shader("float helper() { return 1.0; }\n");

    let err = manager.get_material(&[broken]).unwrap_err();

    assert!(matches!(
        err,
        PrismError::Effect(EffectError::MissingEntryPoint { ref name, .. }) if name == "broken"
    ));
}

//! Golden Text Tests
//!
//! Tests for:
//! - Symbol renaming of a full effect against a stored fixture
//! - Entry-point call emitted into the main-image section

use prism::effects::{Effect, EffectShaderData, Section};

const VIGNETTE: &str = include_str!("golden/vignette.frag");
const VIGNETTE_E1_HEAD: &str = include_str!("golden/vignette_e1_head.frag");

fn vignette() -> Effect {
    Effect::new("vignette")
        .with_fragment_shader(VIGNETTE)
        .with_uniform("offset", 1.0_f32)
        .with_uniform("darkness", 0.5_f32)
}

#[test]
fn vignette_head_matches_fixture() {
    let mut data = EffectShaderData::new();
    let result = data.integrate_effect("e1", &vignette()).unwrap();

    assert_eq!(
        data.parts().get(Section::FragmentHead).trim(),
        VIGNETTE_E1_HEAD.trim()
    );
    assert_eq!(result.varyings, vec!["e1VCoord".to_string()]);
    assert!(!result.reads_depth);
    assert!(!result.transforms_uv);
}

#[test]
fn vignette_main_image_call() {
    let mut data = EffectShaderData::new();
    data.integrate_effect("e1", &vignette()).unwrap();

    assert_eq!(
        data.parts().get(Section::FragmentMainImage),
        "e1MainImage(color0, UV, color1);\n\tcolor0 = blendNormal(color0, color1, e1BlendOpacity);\n\n\t"
    );
    assert!(data.parts().get(Section::FragmentMainUv).is_empty());
    assert!(data.defines().is_empty());
}

//! Shader Data
//!
//! [`ShaderData`] is the bag of macros and uniforms an effect or pass
//! exposes to generated shader programs.

use super::shader_defines::ShaderDefines;
use super::uniforms::{UniformValue, Uniforms};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderData {
    pub defines: ShaderDefines,
    pub uniforms: Uniforms,
}

impl ShaderData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_define(mut self, key: &str, value: &str) -> Self {
        self.defines.set(key, value);
        self
    }

    #[must_use]
    pub fn with_uniform(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.uniforms.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Returns `true` if `name` is an uniform or macro identifier of this bag.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.uniforms.contains_key(name) || self.defines.names().any(|n| n == name)
    }

    /// Merges `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &ShaderData) {
        self.defines.merge(&other.defines);
        for (k, v) in &other.uniforms {
            self.uniforms.insert(k.clone(), *v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_uniforms_and_macro_names() {
        let data = ShaderData::new()
            .with_define("SAMPLE(uv)", "texture2D(map, uv)")
            .with_uniform("intensity", 1.0_f32);

        assert!(data.declares("intensity"));
        assert!(data.declares("SAMPLE"));
        assert!(!data.declares("uv"));
    }

    #[test]
    fn merge_overrides_uniforms() {
        let mut a = ShaderData::new().with_uniform("strength", 0.5_f32);
        let b = ShaderData::new().with_uniform("strength", 2.0_f32);
        a.merge(&b);
        assert_eq!(a.uniform("strength"), Some(&UniformValue::Float(2.0)));
    }
}

//! Blend Modes
//!
//! Every effect blends its `mainImage` output into the running color with a
//! [`BlendFunction`] and a strength (`opacity`). The GLSL body of each
//! function is embedded under `shaders/blend/` and declares a function named
//! `blend`, which the material manager renames to `blend<Name>` so several
//! functions can coexist in one program.
//!
//! [`BlendFunction::Skip`] has no body: an effect using it contributes
//! nothing to the merged program.

use std::borrow::Cow;

use super::shader_env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFunction {
    /// No-op; the effect is left out of the merged program.
    Skip,
    Add,
    Alpha,
    Average,
    Darken,
    Difference,
    Lighten,
    Multiply,
    #[default]
    Normal,
    Overlay,
    Screen,
    /// Replaces the input color, ignoring opacity.
    Src,
    Subtract,
}

impl BlendFunction {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Skip => "Skip",
            Self::Add => "Add",
            Self::Alpha => "Alpha",
            Self::Average => "Average",
            Self::Darken => "Darken",
            Self::Difference => "Difference",
            Self::Lighten => "Lighten",
            Self::Multiply => "Multiply",
            Self::Normal => "Normal",
            Self::Overlay => "Overlay",
            Self::Screen => "Screen",
            Self::Src => "Src",
            Self::Subtract => "Subtract",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [BlendFunction] {
        &[
            Self::Skip,
            Self::Add,
            Self::Alpha,
            Self::Average,
            Self::Darken,
            Self::Difference,
            Self::Lighten,
            Self::Multiply,
            Self::Normal,
            Self::Overlay,
            Self::Screen,
            Self::Src,
            Self::Subtract,
        ]
    }

    #[inline]
    #[must_use]
    pub const fn is_skip(self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Identifier of the renamed GLSL function, e.g. `blendScreen`.
    #[must_use]
    pub fn function_name(self) -> String {
        format!("blend{}", self.name())
    }

    /// GLSL body declaring `blend(x, y, opacity)`; `None` for [`Skip`](Self::Skip).
    #[must_use]
    pub fn shader_code(self) -> Option<Cow<'static, str>> {
        if self.is_skip() {
            return None;
        }
        shader_env::chunk(&format!("blend/{}.frag", self.name().to_ascii_lowercase()))
    }
}

/// Blend function plus strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendMode {
    pub function: BlendFunction,
    pub opacity: f32,
}

impl Default for BlendMode {
    fn default() -> Self {
        Self {
            function: BlendFunction::Normal,
            opacity: 1.0,
        }
    }
}

impl BlendMode {
    #[must_use]
    pub fn new(function: BlendFunction) -> Self {
        Self {
            function,
            opacity: 1.0,
        }
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_function_except_skip_has_code() {
        for &function in BlendFunction::all() {
            let code = function.shader_code();
            if function.is_skip() {
                assert!(code.is_none());
            } else {
                let code = code.unwrap_or_default();
                assert!(code.contains("blend("), "{} has no blend body", function.name());
            }
        }
    }

    #[test]
    fn opacity_is_clamped() {
        let mode = BlendMode::new(BlendFunction::Add).with_opacity(3.0);
        assert!((mode.opacity - 1.0).abs() < f32::EPSILON);
    }
}

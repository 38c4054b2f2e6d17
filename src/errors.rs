//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! - [`EffectError`]: an effect combination that cannot be merged into one
//!   program (exclusive capabilities clash, missing entry points).
//! - [`PassError`]: a pass failed while preparing for a frame.
//! - [`PrismError`]: the crate-level error wrapping both, plus template
//!   rendering failures.
//!
//! None of these errors escape the render loop: passes catch them, log, and
//! disable themselves.

use thiserror::Error;

use crate::effects::EffectId;

/// Errors raised while merging effects into a single material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// The effect declares neither `mainImage` nor `mainUv`.
    #[error("Effect '{name}' ({id}) has no mainImage or mainUv function")]
    MissingEntryPoint {
        /// Effect name
        name: String,
        /// Effect id
        id: EffectId,
    },

    /// Two convolution (exclusive multi-sample) effects in one combination.
    #[error("Convolution effects cannot be merged: '{first}' and '{second}'")]
    ConvolutionClash {
        /// The effect that claimed the convolution slot first
        first: String,
        /// The rejected effect
        second: String,
    },

    /// A UV-transforming effect combined with a convolution effect.
    #[error("Effect '{name}' transforms UVs and cannot be combined with convolution effects")]
    UvTransformWithConvolution {
        /// The offending effect
        name: String,
    },
}

/// Errors raised by a pass while preparing a frame.
#[derive(Error, Debug)]
pub enum PassError {
    /// Material construction failed.
    #[error("Material merge failed: {0}")]
    Merge(#[from] EffectError),

    /// Shader template could not be rendered.
    #[error("Shader template error: {0}")]
    Template(String),
}

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Effect merging failed.
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// A pass failed.
    #[error(transparent)]
    Pass(#[from] PassError),

    /// Shader template rendering failed.
    #[error("Shader template error: {0}")]
    Template(String),

    /// A pass index was outside the pipeline.
    #[error("Pass index out of bounds: {index} (pipeline has {len} passes)")]
    PassIndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Number of passes
        len: usize,
    },
}

impl From<minijinja::Error> for PrismError {
    fn from(err: minijinja::Error) -> Self {
        PrismError::Template(err.to_string())
    }
}

impl From<PrismError> for PassError {
    fn from(err: PrismError) -> Self {
        match err {
            PrismError::Effect(e) => PassError::Merge(e),
            PrismError::Pass(e) => e,
            other => PassError::Template(other.to_string()),
        }
    }
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;

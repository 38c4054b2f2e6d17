//! Built-in passes.

pub mod copy;
pub mod effect;
pub mod geometry;

pub use copy::CopyPass;
pub use effect::EffectPass;
pub use geometry::GeometryPass;

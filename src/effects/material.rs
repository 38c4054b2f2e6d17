//! Effect Materials
//!
//! An [`EffectMaterial`] is the immutable result of merging one effect
//! combination: generated fragment and vertex text plus the macro and uniform
//! tables the device needs to compile and feed it. Materials are shared as
//! `Arc<EffectMaterial>` and never mutated after construction.

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

use super::effect::{EffectAttributes, EffectId};
use super::integration::UniformBinding;
use crate::resources::ShaderDefines;

/// Ordered ids of the enabled, non-skipped effects of a combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinationKey(SmallVec<[EffectId; 8]>);

impl CombinationKey {
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = EffectId>) -> Self {
        Self(ids.into_iter().collect())
    }

    #[must_use]
    pub fn ids(&self) -> &[EffectId] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", id.to_u32())?;
        }
        Ok(())
    }
}

/// A generated program for one [`CombinationKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct EffectMaterial {
    pub(crate) key: CombinationKey,
    pub(crate) fragment_shader: String,
    pub(crate) vertex_shader: String,
    pub(crate) defines: ShaderDefines,
    pub(crate) uniforms: BTreeMap<String, UniformBinding>,
    pub(crate) varyings: Vec<String>,
    pub(crate) attributes: EffectAttributes,
    pub(crate) transforms_uv: bool,
    pub(crate) reads_depth: bool,
    pub(crate) dithering: bool,
    pub(crate) source_hash: u128,
}

impl EffectMaterial {
    /// Hash of the final sources and macros; equal hashes mean the device can
    /// reuse a compiled program.
    pub(crate) fn compute_source_hash(fragment: &str, vertex: &str, defines: &ShaderDefines) -> u128 {
        let directives = defines.to_directives();
        let mut bytes = Vec::with_capacity(directives.len() + fragment.len() + vertex.len() + 2);
        bytes.extend_from_slice(directives.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(fragment.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(vertex.as_bytes());
        xxh3_128(&bytes)
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &CombinationKey {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn fragment_shader(&self) -> &str {
        &self.fragment_shader
    }

    #[inline]
    #[must_use]
    pub fn vertex_shader(&self) -> &str {
        &self.vertex_shader
    }

    #[inline]
    #[must_use]
    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    /// Merged uniforms, excluding the built-in ones every material declares.
    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &BTreeMap<String, UniformBinding> {
        &self.uniforms
    }

    #[inline]
    #[must_use]
    pub fn varyings(&self) -> &[String] {
        &self.varyings
    }

    /// Attributes of the merged effects. Skipped effects contribute no code,
    /// so their flags are absent here; their G-Buffer needs reach the owning
    /// pass through [`Effect::required_components`](super::Effect::required_components).
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> EffectAttributes {
        self.attributes
    }

    #[inline]
    #[must_use]
    pub fn transforms_uv(&self) -> bool {
        self.transforms_uv
    }

    #[inline]
    #[must_use]
    pub fn reads_depth(&self) -> bool {
        self.reads_depth
    }

    #[inline]
    #[must_use]
    pub fn dithering(&self) -> bool {
        self.dithering
    }

    #[inline]
    #[must_use]
    pub fn source_hash(&self) -> u128 {
        self.source_hash
    }

    /// `true` when no effect contributes; the program copies its input.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.key.is_empty()
    }
}

//! Shader Macro Sets
//!
//! [`ShaderDefines`] stores preprocessor macros as interned
//! `(name, value)` pairs kept sorted by symbol, so two macro sets with the
//! same content always hash and compare equal regardless of insertion order.
//!
//! Macro names may carry a parameter list (`"SAMPLE(x)"`); the list is part
//! of the key and [`macro_name`] strips it when only the identifier is needed.
//!
//! ```rust,ignore
//! use prism::resources::ShaderDefines;
//!
//! let mut defines = ShaderDefines::new();
//! defines.set("KERNEL_SIZE", "5");
//! defines.set("SAMPLE(uv)", "texture2D(inputBuffer, uv)");
//!
//! let hash = defines.compute_hash();
//! ```

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::utils::interner::{self, Symbol};

/// A sorted set of shader macro definitions.
#[derive(Debug, Clone, Default)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            defines: Vec::with_capacity(capacity),
        }
    }

    /// Sets a macro, replacing the value of an existing key.
    pub fn set(&mut self, key: &str, value: &str) {
        self.set_symbol(interner::intern(key), interner::intern(value));
    }

    #[inline]
    pub fn set_symbol(&mut self, key: Symbol, value: Symbol) {
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => self.defines[idx].1 = value,
            Err(idx) => self.defines.insert(idx, (key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some(key) = interner::get(key) else {
            return false;
        };

        if let Ok(idx) = self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            self.defines.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        interner::get(key)
            .is_some_and(|key| self.defines.binary_search_by_key(&key, |&(k, _)| k).is_ok())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        let key = interner::get(key)?;
        self.defines
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|idx| interner::resolve(self.defines[idx].1))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.defines.clear();
    }

    /// Iterates `(name, value)` pairs as strings.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
    }

    /// Macro identifiers without their parameter lists.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(|(k, _)| macro_name(k))
    }

    /// Copies every macro of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &ShaderDefines) {
        for &(key, value) in &other.defines {
            self.set_symbol(key, value);
        }
    }

    /// Rebuilds the set, passing every key and value through `f`.
    #[must_use]
    pub fn map_entries(&self, mut f: impl FnMut(&str, &str) -> (String, String)) -> ShaderDefines {
        let mut result = ShaderDefines::with_capacity(self.len());
        for (k, v) in self.iter() {
            let (k, v) = f(k, v);
            result.set(&k, &v);
        }
        result
    }

    /// Lexicographically ordered map, used when emitting `#define` lines.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Renders the set as `#define` directives in lexicographic order.
    #[must_use]
    pub fn to_directives(&self) -> String {
        let mut out = String::new();
        for (k, v) in self.to_map() {
            out.push_str("#define ");
            out.push_str(&k);
            if !v.is_empty() {
                out.push(' ');
                out.push_str(&v);
            }
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        use std::hash::BuildHasher;

        rustc_hash::FxBuildHasher.hash_one(self)
    }
}

/// Strips a macro parameter list: `"SAMPLE(uv)"` becomes `"SAMPLE"`.
#[must_use]
pub fn macro_name(key: &str) -> &str {
    key.split_once('(').map_or(key, |(name, _)| name).trim()
}

impl Hash for ShaderDefines {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.defines.hash(state);
    }
}

impl PartialEq for ShaderDefines {
    fn eq(&self, other: &Self) -> bool {
        self.defines == other.defines
    }
}

impl Eq for ShaderDefines {}

impl From<&[(&str, &str)]> for ShaderDefines {
    fn from(defines: &[(&str, &str)]) -> Self {
        let mut result = Self::with_capacity(defines.len());
        for (k, v) in defines {
            result.set(k, v);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_value() {
        let mut defines = ShaderDefines::new();
        defines.set("KERNEL_SIZE", "3");
        defines.set("KERNEL_SIZE", "5");

        assert_eq!(defines.len(), 1);
        assert_eq!(defines.get("KERNEL_SIZE"), Some("5"));
    }

    #[test]
    fn insertion_order_does_not_affect_hash() {
        let mut d1 = ShaderDefines::new();
        d1.set("A_MACRO", "1");
        d1.set("B_MACRO", "2");

        let mut d2 = ShaderDefines::new();
        d2.set("B_MACRO", "2");
        d2.set("A_MACRO", "1");

        assert_eq!(d1, d2);
        assert_eq!(d1.compute_hash(), d2.compute_hash());
    }

    #[test]
    fn merge_prefers_incoming_values() {
        let mut d1 = ShaderDefines::from(&[("A", "1"), ("B", "2")][..]);
        let d2 = ShaderDefines::from(&[("B", "3"), ("C", "4")][..]);
        d1.merge(&d2);

        assert_eq!(d1.get("A"), Some("1"));
        assert_eq!(d1.get("B"), Some("3"));
        assert_eq!(d1.get("C"), Some("4"));
    }

    #[test]
    fn macro_name_strips_parameters() {
        assert_eq!(macro_name("SAMPLE(uv, lod)"), "SAMPLE");
        assert_eq!(macro_name("PLAIN"), "PLAIN");
    }

    #[test]
    fn directives_are_sorted_and_skip_empty_values() {
        let defines = ShaderDefines::from(&[("ZETA", "2"), ("ALPHA", "")][..]);
        assert_eq!(defines.to_directives(), "#define ALPHA\n#define ZETA 2\n");
    }

    #[test]
    fn remove_unknown_key_is_false() {
        let mut defines = ShaderDefines::new();
        assert!(!defines.remove("NEVER_SET_ANYWHERE"));
    }
}

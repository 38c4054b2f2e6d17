//! Global string interner
//!
//! Converts macro names and values into integer [`Symbol`]s so that macro
//! sets compare and hash as plain integers.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol when already present.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the macro names every merged material defines, so the hot
/// path never allocates for them.
pub fn preload_common_macros() {
    let common = [
        "UV",
        "vUv",
        "transformedUv",
        "FRAMEBUFFER_PRECISION_HIGH",
        "GBUFFER_COLOR",
        "GBUFFER_NORMAL",
        "GBUFFER_DEPTH",
        "GBUFFER_VELOCITY",
        "GBUFFER_POSITION",
        "GBUFFER_EMISSION",
        "GBUFFER_ORM",
        "0",
        "1",
        "2",
    ];

    for name in common {
        intern(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let s1 = intern("EFFECT_STRENGTH");
        let s2 = intern("EFFECT_STRENGTH");
        let s3 = intern("EFFECT_RADIUS");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);

        assert_eq!(resolve(s1), "EFFECT_STRENGTH");
        assert_eq!(resolve(s3), "EFFECT_RADIUS");
    }

    #[test]
    fn test_get() {
        let _ = intern("interned_macro");

        assert!(get("interned_macro").is_some());
        assert!(get("never_interned_macro").is_none());
    }
}

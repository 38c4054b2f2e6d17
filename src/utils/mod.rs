//! Utility Module
//!
//! - [`interner`]: string interning for macro names and values
//!
//! Interned strings ([`Symbol`]s) compare in O(1), which keeps macro-set
//! comparison and hashing cheap when the material cache is probed.
//!
//! ```rust,ignore
//! use prism::utils::interner;
//!
//! let sym1 = interner::intern("DITHERING");
//! let sym2 = interner::intern("DITHERING");
//! assert_eq!(sym1, sym2);
//! ```

pub mod interner;

pub use interner::Symbol;

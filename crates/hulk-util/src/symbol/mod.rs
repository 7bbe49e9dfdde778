//! [`Symbol`]: a compact, `Copy` handle to an interned string.
//!
//! Symbols give O(1) equality/hash for identifiers and type names that
//! would otherwise be compared as `String`s all over `hulk-sem` — every
//! name in `hulk-ast` (identifiers, type names, method names) is a
//! `Symbol`, and `Context`/`Scope` key their maps by `Symbol` rather than
//! `String`.
//!
//! ```
//! use hulk_util::symbol::Symbol;
//!
//! let a = Symbol::intern("x");
//! let b = Symbol::intern("x");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "x");
//! ```

mod interner;

pub use interner::STRING_TABLE;

/// Reserved symbols for HULK keywords, builtin identifiers, and builtin
/// type names, pre-interned at startup so they have stable indices and the
/// pipeline never pays for hashing them.
pub(crate) const KNOWN_SYMBOLS: &[&str] = &[
    // keywords
    "let", "in", "if", "elif", "else", "while", "for", "function", "type", "inherits", "protocol",
    "extends", "is", "as", "new", "self", "base", "true", "false",
    // builtin types
    "Object", "Number", "String", "Boolean", "Vector",
    // builtin globals and functions (spec.md §6)
    "PI", "E", "print", "range", "sqrt", "exp", "log", "rand", "sin", "cos",
    // iterator protocol (spec.md §3, IterableProto)
    "Iterable", "next", "current",
    // vector method names synthesized by VectorType (spec.md §4.3/§4.9)
    "size", "at", "setAt",
];

macro_rules! known_symbol_consts {
    ($($name:ident => $idx:expr),+ $(,)?) => {
        $(pub const $name: Symbol = Symbol { index: $idx };)+
    };
}

known_symbol_consts! {
    KW_LET => 0, KW_IN => 1, KW_IF => 2, KW_ELIF => 3, KW_ELSE => 4,
    KW_WHILE => 5, KW_FOR => 6, KW_FUNCTION => 7, KW_TYPE => 8,
    KW_INHERITS => 9, KW_PROTOCOL => 10, KW_EXTENDS => 11, KW_IS => 12,
    KW_AS => 13, KW_NEW => 14, KW_SELF => 15, KW_BASE => 16,
    KW_TRUE => 17, KW_FALSE => 18,
    TY_OBJECT => 19, TY_NUMBER => 20, TY_STRING => 21, TY_BOOLEAN => 22, TY_VECTOR => 23,
    ID_PI => 24, ID_E => 25, ID_PRINT => 26, ID_RANGE => 27, ID_SQRT => 28,
    ID_EXP => 29, ID_LOG => 30, ID_RAND => 31, ID_SIN => 32, ID_COS => 33,
    PROTO_ITERABLE => 34, ID_NEXT => 35, ID_CURRENT => 36,
    ID_SIZE => 37, ID_AT => 38, ID_SET_AT => 39,
}

/// Profiling statistics for the interner.
#[derive(Clone, Copy, Debug, Default)]
pub struct InternerStats {
    pub count: usize,
    pub capacity: usize,
    pub hits: usize,
    pub misses: usize,
}

impl InternerStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// An interned string identifier. Four bytes, `Copy`, comparable in O(1).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub(crate) index: u32,
}

const RESERVED_SYMBOLS_END: u32 = 512;

impl Symbol {
    #[inline]
    pub fn intern(string: &str) -> Self {
        STRING_TABLE.intern(string)
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        STRING_TABLE.get(*self).unwrap_or("")
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    #[inline]
    pub fn eq_str(&self, other: &str) -> bool {
        self.as_str() == other
    }

    /// True for any symbol pre-interned at startup (keywords, builtin
    /// types, builtin identifiers).
    #[inline]
    pub fn is_known(&self) -> bool {
        self.index < RESERVED_SYMBOLS_END
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.index
    }

    /// # Safety
    ///
    /// `index` must correspond to an entry actually present in the string
    /// table, or `as_str` returns the empty string instead of panicking.
    #[inline]
    pub unsafe fn from_u32_unchecked(index: u32) -> Self {
        Self { index }
    }

    #[inline]
    pub fn stats() -> InternerStats {
        STRING_TABLE.stats()
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Symbols (de)serialize as their underlying text, not their index — an
/// index is only stable within one process's interner, but `hulk-driver`
/// reads AST JSON that may have been produced by a different process (or a
/// fixture written by hand).
impl serde::Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Ok(Symbol::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_display() {
        let s = Symbol::intern("hulk_test_symbol");
        assert_eq!(format!("{s}"), "hulk_test_symbol");
        assert_eq!(format!("{s:?}"), "Symbol(hulk_test_symbol)");
    }

    #[test]
    fn known_symbols_have_expected_text() {
        assert!(KW_LET.eq_str("let"));
        assert!(KW_SELF.eq_str("self"));
        assert!(KW_BASE.eq_str("base"));
        assert!(TY_NUMBER.eq_str("Number"));
        assert!(PROTO_ITERABLE.eq_str("Iterable"));
        assert!(KW_LET.is_known());
    }

    #[test]
    fn unknown_symbols_are_not_known() {
        let s = Symbol::intern("some_user_defined_name_xyz");
        assert!(!s.is_known());
    }

    #[test]
    fn eq_str_matches_as_str() {
        let s = Symbol::intern("abc");
        assert!(s.eq_str("abc"));
        assert!(!s.eq_str("abd"));
    }

    #[test]
    fn len_and_is_empty() {
        assert_eq!(Symbol::intern("").len(), 0);
        assert!(Symbol::intern("").is_empty());
        assert_eq!(Symbol::intern("xyz").len(), 3);
    }
}

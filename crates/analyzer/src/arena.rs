//! # Identifier Interning
//!
//! Variable, parameter, class and template names are interned once and
//! compared by symbol afterwards:
//! - A single process-wide interner so trees built by the builder and the
//!   analyzer agree on symbols without threading an arena through every call
//! - Serialization as plain text, so diagnostics and trees stay readable in JSON

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use string_interner::{DefaultBackend, StringInterner};

/// Symbol type used for string interning
pub type Symbol = string_interner::DefaultSymbol;

static GLOBAL_INTERNER: Lazy<Mutex<StringInterner<DefaultBackend>>> =
    Lazy::new(|| Mutex::new(StringInterner::new()));

fn interner() -> MutexGuard<'static, StringInterner<DefaultBackend>> {
    // A poisoned lock still holds a consistent interner: interning never
    // leaves it half-updated.
    GLOBAL_INTERNER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A symbol representing an interned identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedString(Symbol);

impl InternedString {
    /// Intern `s` in the global interner
    pub fn new_global(s: &str) -> Self {
        InternedString(interner().get_or_intern(s))
    }

    /// Resolve this symbol back to its text
    pub fn resolve_global(&self) -> Option<String> {
        interner().resolve(self.0).map(str::to_string)
    }

    /// Get the underlying symbol
    pub fn symbol(&self) -> Symbol {
        self.0
    }

    /// Compare against plain text without allocating a new symbol
    pub fn is(&self, text: &str) -> bool {
        interner().get(text) == Some(self.0)
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        InternedString::new_global(s)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match interner().resolve(self.0) {
            Some(text) => f.write_str(text),
            None => write!(f, "<unresolved {:?}>", self.0),
        }
    }
}

impl Serialize for InternedString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for InternedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(InternedString::new_global(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_symbol() {
        let a = InternedString::new_global("fact");
        let b = InternedString::from("fact");
        let c = InternedString::from("fib");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is("fact"));
        assert!(!a.is("fib"));
    }

    #[test]
    fn test_serializes_as_text() {
        let name = InternedString::from("accumulator");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"accumulator\"");
        let back: InternedString = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}

//! UTF-16 string storage.

use std::fmt;

/// A string of UTF-16 code units.
///
/// Wide strings are stored and serialized unit by unit; they are not required
/// to hold well-formed UTF-16. Conversion to a Rust [`String`] is lossy.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct WideString(pub Vec<u16>);

impl WideString {
    /// Create an empty wide string.
    pub fn new() -> Self {
        Self::default()
    }

    /// The code units.
    pub fn units(&self) -> &[u16] {
        &self.0
    }

    /// Number of code units.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no code units.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode to a Rust string, replacing unpaired surrogates.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }
}

impl From<&str> for WideString {
    fn from(value: &str) -> Self {
        WideString(value.encode_utf16().collect())
    }
}

impl From<String> for WideString {
    fn from(value: String) -> Self {
        WideString::from(value.as_str())
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{:?}", self.to_string_lossy())
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

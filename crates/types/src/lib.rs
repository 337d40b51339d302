//! Validated text primitives shared across the MedLedger crates.
//!
//! Every identifier that participates in a ledger key, and every required
//! free-text field, is validated once at the boundary and then carried as a
//! typed value. This keeps the domain crates free of repeated trim/empty
//! checks.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    /// The input contained a character that cannot appear in a ledger key
    #[error("identifier contains characters not permitted in a ledger key")]
    KeyUnsafe,
}

/// A string type that guarantees non-empty content.
///
/// Wraps a `String` and ensures it contains at least one non-whitespace
/// character. The input is trimmed of leading and trailing whitespace during
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An identifier that is safe to embed as a composite-key attribute.
///
/// Ledger keys separate their parts with `U+0000`, so an identifier that
/// contained that separator (or a line break) could alias another key. This
/// type guarantees a trimmed, non-empty value free of those characters.
/// Spaces are allowed: medicine names such as `"vitamin d"` are legitimate
/// key attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerId(String);

impl LedgerId {
    /// Creates a new `LedgerId` from the given input.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().any(|c| c == '\u{0}' || c == '\n' || c == '\r') {
            return Err(TextError::KeyUnsafe);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LedgerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for LedgerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for LedgerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LedgerId::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_and_accepts() {
        let text = NonEmptyText::new("  City General  ").expect("should accept");
        assert_eq!(text.as_str(), "City General");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace_only() {
        let err = NonEmptyText::new("   ").expect_err("should reject");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn test_ledger_id_rejects_key_separator() {
        let err = LedgerId::new("pat\u{0}ient").expect_err("should reject");
        assert!(matches!(err, TextError::KeyUnsafe));
    }

    #[test]
    fn test_ledger_id_allows_inner_spaces() {
        let id = LedgerId::new("vitamin d").expect("should accept");
        assert_eq!(id.as_str(), "vitamin d");
    }
}

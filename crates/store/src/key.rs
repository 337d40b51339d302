//! Ledger key construction.
//!
//! All documents live in one flat key namespace. Composite keys concatenate a
//! category tag with one or more identifying attributes, separated by `U+0000`
//! so that no legal attribute value can alias another key, and terminated with
//! a trailing separator so that a full key is never a prefix of a sibling.
//! The same encoding yields scan prefixes for whole categories or for a
//! category narrowed by leading attributes.
//!
//! Two legacy plain-key shapes are also supported (bare hospital ids and
//! `{hospitalId}_DOCTOR_{doctorId}` doctor keys); those bypass the composite
//! encoding entirely.

use crate::{StoreError, StoreResult};

const SEPARATOR: char = '\u{0}';

fn check_part(part: &str) -> StoreResult<()> {
    if part.is_empty() {
        return Err(StoreError::EmptyKeyPart);
    }
    if part.chars().any(|c| c == SEPARATOR || c == '\n' || c == '\r') {
        return Err(StoreError::UnsafeKeyPart(part.to_owned()));
    }
    Ok(())
}

/// A fully-formed ledger key addressing exactly one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedgerKey(String);

impl LedgerKey {
    /// Builds a composite key from a category tag and identifying attributes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::EmptyKeyPart` or `StoreError::UnsafeKeyPart` if
    /// the category or any attribute is empty or contains reserved
    /// characters.
    pub fn composite(category: &str, attributes: &[&str]) -> StoreResult<Self> {
        check_part(category)?;
        let mut key = String::with_capacity(category.len() + 2);
        key.push(SEPARATOR);
        key.push_str(category);
        key.push(SEPARATOR);
        for attribute in attributes {
            check_part(attribute)?;
            key.push_str(attribute);
            key.push(SEPARATOR);
        }
        Ok(Self(key))
    }

    /// Wraps a plain (non-composite) key such as a bare hospital id.
    pub fn plain(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Render the separator visibly for diagnostics.
        write!(f, "{}", self.0.replace(SEPARATOR, "|"))
    }
}

/// A key prefix selecting a contiguous range of ledger keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Builds a scan prefix covering a whole category, optionally narrowed by
    /// leading attributes. `KeyPrefix::category("record", &["P1"])` matches
    /// every record belonging to patient `P1`.
    pub fn category(category: &str, leading_attributes: &[&str]) -> StoreResult<Self> {
        let key = LedgerKey::composite(category, leading_attributes)?;
        Ok(Self(key.0))
    }

    /// Wraps a plain string prefix, used for the legacy doctor key shape.
    pub fn plain(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Returns the raw prefix string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_is_prefixed_by_its_category_scan() {
        let key = LedgerKey::composite("record", &["P1", "R-tx1"]).expect("key should build");
        let prefix = KeyPrefix::category("record", &["P1"]).expect("prefix should build");
        assert!(key.as_str().starts_with(prefix.as_str()));
    }

    #[test]
    fn test_sibling_categories_do_not_alias() {
        let consent = LedgerKey::composite("consent", &["P1", "E1"]).expect("key should build");
        let record_prefix = KeyPrefix::category("record", &["P1"]).expect("prefix should build");
        assert!(!consent.as_str().starts_with(record_prefix.as_str()));
    }

    #[test]
    fn test_attribute_cannot_smuggle_separator() {
        let err = LedgerKey::composite("record", &["P1\u{0}evil"]).expect_err("should reject");
        assert!(matches!(err, StoreError::UnsafeKeyPart(_)));
    }

    #[test]
    fn test_empty_attribute_rejected() {
        let err = LedgerKey::composite("record", &[""]).expect_err("should reject");
        assert!(matches!(err, StoreError::EmptyKeyPart));
    }

    #[test]
    fn test_full_key_never_prefixes_sibling() {
        // ("patient", "P1") must not match a scan for ("patient", "P10").
        let p1 = LedgerKey::composite("patient", &["P1"]).expect("key should build");
        let p10 = LedgerKey::composite("patient", &["P10"]).expect("key should build");
        assert!(!p10.as_str().starts_with(p1.as_str()));
    }
}

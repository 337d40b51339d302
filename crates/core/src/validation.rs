//! Input validation helpers.
//!
//! Required fields are validated eagerly at the top of each operation, before
//! any state is read, and failures name the offending field the way the
//! caller supplied it.

use medledger_types::{LedgerId, NonEmptyText};

use crate::error::{LedgerError, LedgerResult};

/// Validates a required identifier field.
pub(crate) fn required_id(value: &str, field: &str) -> LedgerResult<LedgerId> {
    LedgerId::new(value)
        .map_err(|_| LedgerError::Validation(format!("{field} is required and must be a valid id")))
}

/// Validates a required free-text field.
pub(crate) fn required_text(value: &str, field: &str) -> LedgerResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| LedgerError::Validation(format!("{field} is required")))
}

/// Normalizes an optional free-text field: trimmed, empty collapsed to None.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Parses a client-supplied non-negative integer field.
pub(crate) fn non_negative_int(value: &str, field: &str) -> LedgerResult<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        LedgerError::Validation(format!("{field} must be a non-negative integer"))
    })
}

/// Parses a client-supplied strictly positive integer field.
pub(crate) fn positive_int(value: &str, field: &str) -> LedgerResult<u64> {
    let parsed = non_negative_int(value, field)?;
    if parsed == 0 {
        return Err(LedgerError::Validation(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_id_rejects_blank() {
        let err = required_id("  ", "patientId").expect_err("should reject");
        assert!(err.to_string().contains("patientId"));
    }

    #[test]
    fn test_non_negative_int_rejects_negative_and_garbage() {
        assert!(non_negative_int("-3", "newStock").is_err());
        assert!(non_negative_int("ten", "newStock").is_err());
        assert_eq!(
            non_negative_int(" 10 ", "newStock").expect("should parse"),
            10
        );
    }

    #[test]
    fn test_positive_int_rejects_zero() {
        let err = positive_int("0", "amount").expect_err("should reject");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_optional_text_collapses_empty() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" Pune ")), Some("Pune".to_owned()));
        assert_eq!(optional_text(None), None);
    }
}

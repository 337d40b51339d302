//! Error taxonomy for ledger operations.
//!
//! Every failed operation surfaces as exactly one of these categories, with a
//! human-readable message that is returned to the caller verbatim. Checks run
//! eagerly at the top of each operation in the order validation → existence →
//! authorization → business rule; the first failure aborts the operation with
//! no state mutation.

use medledger_store::StoreError;
use medledger_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Missing or malformed input: empty required fields, numbers that fail
    /// to parse or are out of range.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced entity or document is absent from the ledger.
    #[error("{what} {id} does not exist")]
    NotFound {
        what: &'static str,
        id: String,
    },

    /// Role mismatch, organization mismatch, caller-is-not-owner, missing
    /// grant or consent.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Attempted creation of an entity whose unique key already exists.
    #[error("{what} {id} already exists")]
    Conflict {
        what: &'static str,
        id: String,
    },

    /// A domain rule rejected the operation: coverage cap exceeded,
    /// insufficient stock or balance, prescription mismatch, claim already
    /// approved.
    #[error("{0}")]
    BusinessRule(String),

    /// The state store failed.
    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    /// A document failed to encode or decode.
    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<TextError> for LedgerError {
    fn from(err: TextError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

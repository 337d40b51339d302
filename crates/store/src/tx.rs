//! Transaction metadata.

use chrono::{DateTime, Utc};

/// Metadata of the enclosing ledger transaction.
///
/// The id and timestamp are assigned by the transaction layer before the
/// domain core runs, so every replica evaluating the same transaction derives
/// identical record ids and timestamps. The domain core must never substitute
/// a wall-clock reading for this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMeta {
    /// Globally unique transaction id, treated as opaque.
    pub id: String,
    /// Logical timestamp of the transaction.
    pub timestamp: DateTime<Utc>,
}

impl TxMeta {
    /// Creates transaction metadata from an id and a logical timestamp.
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }
}

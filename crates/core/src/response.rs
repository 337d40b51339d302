//! Result envelopes for the transport layer.
//!
//! Mutations are reported as `{"success": true, "message": ..., ...}` with
//! the typed outcome flattened in; list queries are bare JSON arrays. An
//! empty list is `[]`; the legacy message-object form for empty results is
//! not produced.

use serde::Serialize;

use crate::error::LedgerResult;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    message: &'a str,
    #[serde(flatten)]
    data: &'a T,
}

/// Serializes a mutation outcome into the success envelope.
pub fn success_response<T: Serialize>(message: &str, data: &T) -> LedgerResult<String> {
    Ok(serde_json::to_string(&Envelope {
        success: true,
        message,
        data,
    })?)
}

/// Serializes query rows as a bare JSON array.
pub fn list_response<T: Serialize>(rows: &[T]) -> LedgerResult<String> {
    Ok(serde_json::to_string(&rows)?)
}

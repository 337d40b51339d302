//! MedLedger state store
//!
//! This crate defines the boundary between the MedLedger domain core and
//! whatever ledger runtime ultimately holds the state. The domain core only
//! ever sees:
//!
//! - a [`StateStore`]: exact-key get/put/delete plus prefix range scans
//! - [`LedgerKey`] / [`KeyPrefix`]: composite keys built from a category tag
//!   and identifying attributes, addressable both directly and by prefix
//! - [`TxMeta`]: the enclosing transaction's id and logical timestamp
//!
//! ## Design Principles
//!
//! - One operation equals one serializable transaction; optimistic-concurrency
//!   conflicts are resolved by the backing ledger at commit time, never here.
//! - Timestamps are transaction metadata handed in from outside. Nothing in
//!   this crate or the domain core reads a wall clock, so replaying the same
//!   transactions always produces byte-identical state.
//! - Prefix scans are lazy cursors. A scan borrows the store for its lifetime
//!   and releases whatever the backend holds when it is dropped, on every exit
//!   path.
//!
//! [`MemLedger`] is the reference implementation: a `BTreeMap`-backed store
//! whose ordered keys make prefix scans natural. It supports human-readable
//! JSON snapshots so a CLI session can persist state between invocations.

mod key;
mod memory;
mod tx;

pub use key::{KeyPrefix, LedgerKey};
pub use memory::{MemLedger, MemScan};
pub use tx::TxMeta;

/// Errors that can occur at the state-store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key part contained the composite-key separator or a line break
    #[error("invalid key part {0:?}: contains characters reserved by the key encoding")]
    UnsafeKeyPart(String),

    /// A composite key was built with an empty category or attribute
    #[error("invalid key part: empty category or attribute")]
    EmptyKeyPart,

    /// Snapshot serialization or deserialization failed
    #[error("snapshot codec error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A stored value was not valid UTF-8 and cannot be snapshotted
    #[error("value under key {0:?} is not valid UTF-8")]
    ValueNotUtf8(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A single key/value pair produced by a prefix scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    /// The full ledger key the value is stored under.
    pub key: String,
    /// The stored bytes.
    pub value: Vec<u8>,
}

/// The abstract ledger state store the domain core operates against.
///
/// Implementations must provide read-your-writes semantics within a single
/// operation: a `get` after a `put` in the same transaction observes the new
/// value. Cross-transaction conflict handling belongs to the backing ledger.
pub trait StateStore {
    /// The cursor type returned by [`StateStore::scan_prefix`]. Borrows the
    /// store, yields entries in ascending key order, and releases backend
    /// resources when dropped.
    type Scan<'a>: Iterator<Item = StoreResult<StateEntry>> + 'a
    where
        Self: 'a;

    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &LedgerKey) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, overwriting any previous value.
    fn put(&mut self, key: &LedgerKey, value: Vec<u8>) -> StoreResult<()>;

    /// Removes the value stored under `key`. Removing an absent key is not an
    /// error; existence checks are the caller's concern.
    fn delete(&mut self, key: &LedgerKey) -> StoreResult<()>;

    /// Returns a lazy cursor over all entries whose key starts with `prefix`,
    /// in ascending key order.
    fn scan_prefix(&self, prefix: &KeyPrefix) -> StoreResult<Self::Scan<'_>>;
}

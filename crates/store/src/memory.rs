//! In-memory reference implementation of the state store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{KeyPrefix, LedgerKey, StateEntry, StateStore, StoreError, StoreResult};

/// A `BTreeMap`-backed state store.
///
/// Ordered keys make prefix scans a contiguous range walk. Used as the test
/// substitute for a real ledger and as the CLI's session store via
/// [`MemLedger::to_snapshot`] / [`MemLedger::from_snapshot`].
#[derive(Debug, Default, Clone)]
pub struct MemLedger {
    entries: BTreeMap<String, Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    entries: BTreeMap<String, String>,
}

impl MemLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger holds no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the full ledger state to a human-readable JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ValueNotUtf8` if any stored value is not UTF-8
    /// (all MedLedger documents are canonical JSON, so this indicates a
    /// foreign writer), or `StoreError::Snapshot` on serialization failure.
    pub fn to_snapshot(&self) -> StoreResult<String> {
        let mut entries = BTreeMap::new();
        for (key, value) in &self.entries {
            let text = String::from_utf8(value.clone())
                .map_err(|_| StoreError::ValueNotUtf8(key.clone()))?;
            entries.insert(key.clone(), text);
        }
        Ok(serde_json::to_string_pretty(&Snapshot { entries })?)
    }

    /// Restores a ledger from a snapshot produced by [`MemLedger::to_snapshot`].
    pub fn from_snapshot(snapshot: &str) -> StoreResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(snapshot)?;
        Ok(Self {
            entries: snapshot
                .entries
                .into_iter()
                .map(|(key, value)| (key, value.into_bytes()))
                .collect(),
        })
    }
}

impl StateStore for MemLedger {
    type Scan<'a>
        = MemScan<'a>
    where
        Self: 'a;

    fn get(&self, key: &LedgerKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key.as_str()).cloned())
    }

    fn put(&mut self, key: &LedgerKey, value: Vec<u8>) -> StoreResult<()> {
        self.entries.insert(key.as_str().to_owned(), value);
        Ok(())
    }

    fn delete(&mut self, key: &LedgerKey) -> StoreResult<()> {
        self.entries.remove(key.as_str());
        Ok(())
    }

    fn scan_prefix(&self, prefix: &KeyPrefix) -> StoreResult<Self::Scan<'_>> {
        Ok(MemScan {
            range: self.entries.range(prefix.as_str().to_owned()..),
            prefix: prefix.as_str().to_owned(),
        })
    }
}

/// Lazy cursor over a [`MemLedger`] prefix range.
///
/// Yields entries in ascending key order and stops at the first key outside
/// the prefix. Dropping the cursor releases the borrow on the store.
pub struct MemScan<'a> {
    range: std::collections::btree_map::Range<'a, String, Vec<u8>>,
    prefix: String,
}

impl Iterator for MemScan<'_> {
    type Item = StoreResult<StateEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.range.next()?;
        if !key.starts_with(&self.prefix) {
            return None;
        }
        Some(Ok(StateEntry {
            key: key.clone(),
            value: value.clone(),
        }))
    }
}

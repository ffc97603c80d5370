//! Immutable snapshots and the cell publishing them.

use anystore_codec::{to_canonical_cbor, CodecResult, Value, ValueMap};
use parking_lot::RwLock;
use std::sync::Arc;

/// The whole content of a store at one instant.
///
/// A snapshot is never mutated after it is published; a write builds a new
/// one from the previous content plus a [`Change`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: ValueMap,
}

impl Snapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    /// The value under `key`.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys, in canonical order.
    #[must_use]
    pub fn keys(&self) -> Vec<Value> {
        let mut keys: Vec<Value> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The underlying mapping.
    #[must_use]
    pub fn entries(&self) -> &ValueMap {
        &self.entries
    }

    /// A copy of this snapshot with `change` applied.
    #[must_use]
    pub fn with_change(&self, change: &Change) -> Self {
        let mut entries = self.entries.clone();
        change.apply(&mut entries);
        Self { entries }
    }
}

impl From<ValueMap> for Snapshot {
    fn from(entries: ValueMap) -> Self {
        Self { entries }
    }
}

/// One pending single-key modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Insert or replace `key` with `value`.
    Upsert {
        /// Key to set.
        key: Value,
        /// New value.
        value: Value,
    },
    /// Remove `key`, if present.
    Remove {
        /// Key to remove.
        key: Value,
    },
}

impl Change {
    /// Applies the change to `entries`.
    pub fn apply(&self, entries: &mut ValueMap) {
        match self {
            Change::Upsert { key, value } => {
                entries.insert(key.clone(), value.clone());
            }
            Change::Remove { key } => {
                entries.remove(key);
            }
        }
    }

    /// The key the change touches.
    #[must_use]
    pub fn key(&self) -> &Value {
        match self {
            Change::Upsert { key, .. } | Change::Remove { key } => key,
        }
    }

    /// Fails if the change could not be written to a snapshot file.
    ///
    /// The persisted path finds out when it serializes the snapshot; the
    /// in-memory path asks here, so both refuse the same values.
    pub fn check_encodable(&self) -> CodecResult<()> {
        if let Change::Upsert { key, value } = self {
            to_canonical_cbor(key)?;
            to_canonical_cbor(value)?;
        }
        Ok(())
    }
}

/// Holds the current snapshot; readers clone the `Arc` under a momentary
/// shared guard, writers swap it.
///
/// Every publication bumps a generation counter, so a reader that built a
/// snapshot without the write lock can tell whether a writer got in first.
#[derive(Debug, Default)]
pub(crate) struct SnapshotCell {
    current: RwLock<Published>,
}

#[derive(Debug, Default)]
struct Published {
    generation: u64,
    snapshot: Arc<Snapshot>,
}

impl SnapshotCell {
    pub(crate) fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().snapshot)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.current.read().generation
    }

    pub(crate) fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut current = self.current.write();
        current.generation += 1;
        current.snapshot = snapshot;
    }

    /// Publishes unless something was published after `seen` was read.
    pub(crate) fn publish_if_unchanged(&self, seen: u64, snapshot: Arc<Snapshot>) -> bool {
        let mut current = self.current.write();
        if current.generation != seen {
            return false;
        }
        current.generation += 1;
        current.snapshot = snapshot;
        true
    }
}

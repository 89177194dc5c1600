use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use backref_types::{NodeId, RecordSnapshot, ReferenceRecord};

use crate::error::{StoreError, StoreResult};
use crate::traits::ReferenceStore;

/// In-memory, HashMap-based reference store.
///
/// Intended for tests and embedding. Records are held as snapshots behind a
/// `RwLock`; every load hands out a fresh [`ReferenceRecord`], so mutating a
/// loaded record never changes what is stored until `store` is called.
#[derive(Default)]
pub struct InMemoryReferenceStore {
    records: RwLock<HashMap<NodeId, RecordSnapshot>>,
}

impl InMemoryReferenceStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Sorted list of every target with a stored record.
    pub fn targets(&self) -> StoreResult<Vec<NodeId>> {
        let mut ids: Vec<NodeId> = self.read()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    /// The stored snapshot for `target`, without building a record.
    pub fn snapshot(&self, target: &NodeId) -> StoreResult<Option<RecordSnapshot>> {
        Ok(self.read()?.get(target).cloned())
    }

    /// Remove every record from the store.
    pub fn clear(&self) -> StoreResult<()> {
        self.write()?.clear();
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<NodeId, RecordSnapshot>>> {
        self.records
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<NodeId, RecordSnapshot>>> {
        self.records
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn load(&self, target: &NodeId) -> StoreResult<Option<ReferenceRecord>> {
        Ok(self
            .read()?
            .get(target)
            .cloned()
            .map(ReferenceRecord::from_snapshot))
    }

    fn store(&self, record: &ReferenceRecord) -> StoreResult<()> {
        let snapshot = record.snapshot();
        self.write()?.insert(snapshot.target, snapshot);
        Ok(())
    }

    fn destroy(&self, record: &ReferenceRecord) -> StoreResult<()> {
        self.write()?.remove(&record.target());
        Ok(())
    }

    fn exists(&self, target: &NodeId) -> StoreResult<bool> {
        Ok(self.read()?.contains_key(target))
    }
}

impl std::fmt::Debug for InMemoryReferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.records.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InMemoryReferenceStore")
            .field("record_count", &count)
            .finish()
    }
}

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use backref_store::{ReferenceStore, StoreError};
use backref_types::{NodeId, ReferenceRecord, TargetId};
use tracing::{debug, error};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult, StoreOp};
use crate::stats::CacheStats;
use crate::table::EntryTable;

/// Write-through cache of reference records in front of a [`ReferenceStore`].
///
/// Callers `get` a record, mutate it in place and hand it back with `save`.
/// Saving a record that has no referrers left deletes it from the store
/// instead of persisting it. The cache is the only code path that should
/// touch the store for reference records.
///
/// Every operation runs under one lock for the whole cache, store call
/// included. Operations on unrelated targets therefore serialize, but a
/// miss-load-insert or empty-check-destroy sequence can never interleave
/// with another operation, and at most one load per target is in flight.
///
/// The cache is not authoritative: a missing entry means "unknown" and is
/// resolved by asking the store.
pub struct ReferenceCache<S> {
    store: S,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

struct CacheState {
    table: EntryTable,
    stats: CacheStats,
}

impl<S: ReferenceStore> ReferenceCache<S> {
    /// Create a cache over `store` with the default configuration.
    pub fn new(store: S) -> Self {
        Self::build(store, CacheConfig::default())
    }

    /// Create a cache over `store` with a validated configuration.
    pub fn with_config(store: S, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: S, config: CacheConfig) -> Self {
        let table = EntryTable::new(config.retention);
        Self {
            store,
            config,
            state: Mutex::new(CacheState {
                table,
                stats: CacheStats::default(),
            }),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The reference record for `target`.
    ///
    /// Served from the cache when possible. Otherwise the record is loaded
    /// from the store, or created empty if the store has none; an empty
    /// record is not persisted until it is saved with referrers. A load
    /// failure leaves the cache untouched.
    pub fn get(&self, target: &TargetId) -> CacheResult<Arc<ReferenceRecord>> {
        let id = target.canonical();
        let mut state = self.lock()?;

        if let Some(record) = state.table.get(&id) {
            state.stats.hits += 1;
            debug!(node = %id, "reference cache hit");
            return Ok(record);
        }
        state.stats.misses += 1;

        let record = match self.store.load(&id) {
            Ok(Some(record)) if record.target() != id => {
                state.stats.failures += 1;
                let source = StoreError::ForeignRecord {
                    requested: id,
                    returned: record.target(),
                };
                return Err(persistence_failure(StoreOp::Load, id, source));
            }
            Ok(Some(record)) => {
                debug!(node = %id, referrers = record.len(), "references loaded");
                record
            }
            Ok(None) => {
                state.stats.created += 1;
                debug!(node = %id, "no persisted references; starting empty");
                ReferenceRecord::new(id)
            }
            Err(source) => {
                state.stats.failures += 1;
                return Err(persistence_failure(StoreOp::Load, id, source));
            }
        };

        let record = Arc::new(record);
        state.table.insert(Arc::clone(&record));
        Ok(record)
    }

    /// Persist `record`, or delete it if it has no referrers left.
    ///
    /// A record not yet cached under its target is cached before the store
    /// is called, and stays cached even if the store call fails. A different
    /// instance already cached for the same target is left in place.
    pub fn save(&self, record: &Arc<ReferenceRecord>) -> CacheResult<()> {
        let mut state = self.lock()?;

        if !record.has_references() {
            return self.remove_locked(&mut state, record);
        }

        let id = record.target();
        if state.table.get(&id).is_none() {
            state.table.insert(Arc::clone(record));
        }

        match self.store.store(record) {
            Ok(()) => {
                state.stats.stores += 1;
                debug!(node = %id, referrers = record.len(), "references stored");
                Ok(())
            }
            Err(source) => {
                state.stats.failures += 1;
                Err(persistence_failure(StoreOp::Store, id, source))
            }
        }
    }

    /// Delete the persisted record and drop it from the cache.
    ///
    /// If the store fails the cache is left as it was; removal is only
    /// confirmed once this returns `Ok`.
    pub fn remove(&self, record: &ReferenceRecord) -> CacheResult<()> {
        let mut state = self.lock()?;
        self.remove_locked(&mut state, record)
    }

    fn remove_locked(&self, state: &mut CacheState, record: &ReferenceRecord) -> CacheResult<()> {
        let id = record.target();
        if let Err(source) = self.store.destroy(record) {
            state.stats.failures += 1;
            return Err(persistence_failure(StoreOp::Destroy, id, source));
        }
        state.stats.destroys += 1;
        state.table.remove(&id);
        debug!(node = %id, "references destroyed");
        Ok(())
    }

    /// Whether anything references `target`.
    ///
    /// Answered from a cached record if there is one, otherwise by asking
    /// the store whether a record exists. Never adds a cache entry.
    pub fn has_references(&self, target: &TargetId) -> CacheResult<bool> {
        let id = target.canonical();
        let mut state = self.lock()?;
        if let Some(record) = state.table.get(&id) {
            return Ok(record.has_references());
        }
        self.store.exists(&id).map_err(|source| {
            state.stats.failures += 1;
            persistence_failure(StoreOp::Exists, id, source)
        })
    }

    /// Whether a live entry for `target` is cached. Never touches the store.
    pub fn is_cached(&self, target: &TargetId) -> CacheResult<bool> {
        Ok(self.lock()?.table.contains(&target.canonical()))
    }

    /// Drop the cache's hold on `target` without touching the store.
    ///
    /// The next `get` reloads the persisted record. Returns `true` if a live
    /// entry was dropped.
    pub fn evict(&self, target: &TargetId) -> CacheResult<bool> {
        let id = target.canonical();
        let evicted = self.lock()?.table.remove(&id);
        if evicted {
            debug!(node = %id, "references evicted");
        }
        Ok(evicted)
    }

    /// Drop every entry without touching the store.
    pub fn clear(&self) -> CacheResult<()> {
        self.lock()?.table.clear();
        Ok(())
    }

    /// Number of live entries.
    pub fn len(&self) -> CacheResult<usize> {
        Ok(self.lock()?.table.len())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// A snapshot of the cache's counters.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let state = self.lock()?;
        Ok(CacheStats {
            reclaimed: state.table.reclaimed(),
            entries: state.table.len(),
            ..state.stats
        })
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

fn persistence_failure(op: StoreOp, target: NodeId, source: StoreError) -> CacheError {
    error!(%op, node = %target, error = %source, "reference store operation failed");
    CacheError::Persistence { op, target, source }
}

impl<S> fmt::Debug for ReferenceCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

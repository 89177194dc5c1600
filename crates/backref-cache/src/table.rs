//! The cache's entry table and its retention bookkeeping.
//!
//! Every entry tracks its record weakly, so a record that some caller still
//! holds is always found again. On top of that the table pins records with a
//! strong reference according to the [`RetentionPolicy`]; an entry that is
//! neither pinned nor held by a caller is gone.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use backref_types::{NodeId, ReferenceRecord};
use tracing::debug;

use crate::config::RetentionPolicy;

/// Entry count that triggers the first sweep of dead weak entries.
const MIN_SWEEP_THRESHOLD: usize = 64;

struct Entry {
    record: Weak<ReferenceRecord>,
    pinned: Option<Arc<ReferenceRecord>>,
    last_used: u64,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.record.strong_count() > 0
    }
}

pub(crate) struct EntryTable {
    policy: RetentionPolicy,
    entries: HashMap<NodeId, Entry>,
    /// Pinned entries of a bounded table keyed by last use, oldest first.
    recency: BTreeMap<u64, NodeId>,
    clock: u64,
    sweep_at: usize,
    reclaimed: u64,
}

impl EntryTable {
    pub(crate) fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            clock: 0,
            sweep_at: MIN_SWEEP_THRESHOLD,
            reclaimed: 0,
        }
    }

    /// The live record for `id`, marking it most recently used.
    pub(crate) fn get(&mut self, id: &NodeId) -> Option<Arc<ReferenceRecord>> {
        let record = self.entries.get(id)?.record.upgrade();
        match record {
            Some(record) => {
                self.touch(id, &record);
                Some(record)
            }
            None => {
                self.drop_entry(id);
                self.reclaimed += 1;
                debug!(node = %id, "reference record reclaimed");
                None
            }
        }
    }

    /// Whether a live entry exists for `id`. Does not affect recency.
    pub(crate) fn contains(&self, id: &NodeId) -> bool {
        self.entries.get(id).is_some_and(Entry::is_live)
    }

    /// Cache `record` under its target, replacing any previous entry.
    pub(crate) fn insert(&mut self, record: Arc<ReferenceRecord>) {
        let id = record.target();
        self.drop_entry(&id);
        self.entries.insert(
            id,
            Entry {
                record: Arc::downgrade(&record),
                pinned: None,
                last_used: 0,
            },
        );
        self.touch(&id, &record);

        if self.entries.len() >= self.sweep_at {
            self.sweep();
        }
    }

    /// Drop the entry for `id`. Returns `true` if a live entry was removed.
    pub(crate) fn remove(&mut self, id: &NodeId) -> bool {
        self.drop_entry(id).is_some_and(|entry| entry.is_live())
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    /// Number of live entries.
    pub(crate) fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_live()).count()
    }

    /// Entries found dead or dropped for capacity since the table was built.
    pub(crate) fn reclaimed(&self) -> u64 {
        self.reclaimed
    }

    fn touch(&mut self, id: &NodeId, record: &Arc<ReferenceRecord>) {
        self.clock += 1;
        let now = self.clock;
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut entry.last_used, now);

        match self.policy {
            RetentionPolicy::Weak => {}
            RetentionPolicy::Unbounded => {
                entry.pinned.get_or_insert_with(|| Arc::clone(record));
            }
            RetentionPolicy::Bounded { capacity } => {
                if entry.pinned.is_some() {
                    self.recency.remove(&previous);
                } else {
                    entry.pinned = Some(Arc::clone(record));
                }
                self.recency.insert(now, *id);
                self.enforce_capacity(capacity);
            }
        }
    }

    fn enforce_capacity(&mut self, capacity: usize) {
        while self.recency.len() > capacity {
            let Some((_, id)) = self.recency.pop_first() else {
                break;
            };
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            entry.pinned = None;
            if !entry.is_live() {
                self.entries.remove(&id);
                self.reclaimed += 1;
                debug!(node = %id, "reference record reclaimed");
            }
        }
    }

    fn drop_entry(&mut self, id: &NodeId) -> Option<Entry> {
        let entry = self.entries.remove(id)?;
        if entry.pinned.is_some() {
            self.recency.remove(&entry.last_used);
        }
        Some(entry)
    }

    fn sweep(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live());
        let dropped = before - self.entries.len();
        self.reclaimed += dropped as u64;
        self.sweep_at = (self.entries.len() * 2).max(MIN_SWEEP_THRESHOLD);
        if dropped > 0 {
            debug!(dropped, remaining = self.entries.len(), "swept reclaimed entries");
        }
    }
}

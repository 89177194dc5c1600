//! Reference records.
//!
//! A [`ReferenceRecord`] lists every property that points at one target node.
//! Records are handed out by the cache as `Arc<ReferenceRecord>` and mutated
//! in place by callers, so the referrer list sits behind its own lock while
//! the target stays immutable.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::identity::NodeId;
use crate::property::PropertyId;

/// The set of referrers pointing at a single target node.
///
/// The list is ordered and may contain the same referrer more than once: a
/// multi-valued property can reference one target from several values.
pub struct ReferenceRecord {
    target: NodeId,
    referrers: RwLock<Vec<PropertyId>>,
}

impl ReferenceRecord {
    /// An empty record for `target`.
    pub fn new(target: NodeId) -> Self {
        Self::with_referrers(target, Vec::new())
    }

    /// A record pre-populated with `referrers`.
    pub fn with_referrers(target: NodeId, referrers: Vec<PropertyId>) -> Self {
        Self {
            target,
            referrers: RwLock::new(referrers),
        }
    }

    /// Rebuild a record from its persisted form.
    pub fn from_snapshot(snapshot: RecordSnapshot) -> Self {
        Self::with_referrers(snapshot.target, snapshot.referrers)
    }

    /// Copy the current state out for persistence.
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            target: self.target,
            referrers: self.read().clone(),
        }
    }

    /// The target node. Never changes after construction.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Whether at least one referrer points at the target.
    pub fn has_references(&self) -> bool {
        !self.read().is_empty()
    }

    /// Number of referrer entries, duplicates included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_references()
    }

    /// A copy of the referrer list.
    pub fn referrers(&self) -> Vec<PropertyId> {
        self.read().clone()
    }

    pub fn contains(&self, referrer: &PropertyId) -> bool {
        self.read().contains(referrer)
    }

    pub fn add_reference(&self, referrer: PropertyId) {
        self.write().push(referrer);
    }

    pub fn add_all_references(&self, referrers: impl IntoIterator<Item = PropertyId>) {
        self.write().extend(referrers);
    }

    /// Remove one occurrence of `referrer`. Returns `false` if it was absent.
    pub fn remove_reference(&self, referrer: &PropertyId) -> bool {
        let mut list = self.write();
        match list.iter().position(|r| r == referrer) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_all_references(&self) {
        self.write().clear();
    }

    // The list is plain data; a panic elsewhere cannot leave it half-updated,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Vec<PropertyId>> {
        self.referrers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<PropertyId>> {
        self.referrers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ReferenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceRecord")
            .field("target", &self.target)
            .field("referrers", &self.len())
            .finish()
    }
}

/// Plain-data copy of a [`ReferenceRecord`], the unit stores persist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub target: NodeId,
    pub referrers: Vec<PropertyId>,
}

impl From<RecordSnapshot> for ReferenceRecord {
    fn from(snapshot: RecordSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

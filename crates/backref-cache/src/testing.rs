//! Store double for cache tests: records every call and fails on demand.

use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use backref_store::{InMemoryReferenceStore, ReferenceStore, StoreError, StoreResult};
use backref_types::{NodeId, ReferenceRecord};

use crate::error::StoreOp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Call {
    pub op: StoreOp,
    pub target: NodeId,
}

#[derive(Default)]
pub(crate) struct RecordingStore {
    inner: InMemoryReferenceStore,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<StoreOp>>,
    load_delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `load` sleep, widening race windows in concurrency tests.
    pub fn with_load_delay(delay: Duration) -> Self {
        Self {
            load_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: StoreOp) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: StoreOp) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn inner(&self) -> &InMemoryReferenceStore {
        &self.inner
    }

    fn record(&self, op: StoreOp, target: NodeId) -> StoreResult<()> {
        self.calls.lock().unwrap().push(Call { op, target });
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

impl ReferenceStore for RecordingStore {
    fn load(&self, target: &NodeId) -> StoreResult<Option<ReferenceRecord>> {
        if let Some(delay) = self.load_delay {
            thread::sleep(delay);
        }
        self.record(StoreOp::Load, *target)?;
        self.inner.load(target)
    }

    fn store(&self, record: &ReferenceRecord) -> StoreResult<()> {
        self.record(StoreOp::Store, record.target())?;
        self.inner.store(record)
    }

    fn destroy(&self, record: &ReferenceRecord) -> StoreResult<()> {
        self.record(StoreOp::Destroy, record.target())?;
        self.inner.destroy(record)
    }

    fn exists(&self, target: &NodeId) -> StoreResult<bool> {
        self.record(StoreOp::Exists, *target)?;
        self.inner.exists(target)
    }
}

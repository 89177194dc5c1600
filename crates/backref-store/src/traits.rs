use backref_types::{NodeId, ReferenceRecord};

use crate::error::StoreResult;

/// Durable storage for reference records.
///
/// Implementations must be thread-safe (`Send + Sync`). Calls may block on
/// I/O; timeouts and cancellation are the backend's business.
pub trait ReferenceStore: Send + Sync {
    /// Load the record persisted for `target`.
    ///
    /// Returns `Ok(None)` if no record exists.
    /// Returns `Err` on I/O failure or data corruption.
    fn load(&self, target: &NodeId) -> StoreResult<Option<ReferenceRecord>>;

    /// Persist `record`, replacing whatever was stored for its target.
    fn store(&self, record: &ReferenceRecord) -> StoreResult<()>;

    /// Delete the persisted record for `record`'s target.
    ///
    /// Destroying a record that was never stored is not an error.
    fn destroy(&self, record: &ReferenceRecord) -> StoreResult<()>;

    /// Check whether a record is persisted for `target`.
    ///
    /// Default implementation loads the record. Backends may override with a
    /// cheaper existence probe.
    fn exists(&self, target: &NodeId) -> StoreResult<bool> {
        Ok(self.load(target)?.is_some())
    }
}

impl<S: ReferenceStore + ?Sized> ReferenceStore for std::sync::Arc<S> {
    fn load(&self, target: &NodeId) -> StoreResult<Option<ReferenceRecord>> {
        (**self).load(target)
    }

    fn store(&self, record: &ReferenceRecord) -> StoreResult<()> {
        (**self).store(record)
    }

    fn destroy(&self, record: &ReferenceRecord) -> StoreResult<()> {
        (**self).destroy(record)
    }

    fn exists(&self, target: &NodeId) -> StoreResult<bool> {
        (**self).exists(target)
    }
}

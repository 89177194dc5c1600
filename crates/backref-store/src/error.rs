use std::path::PathBuf;

use backref_types::NodeId;

/// Errors from reference store operations.
///
/// Absence is not an error: [`ReferenceStore::load`](crate::ReferenceStore::load)
/// reports it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted data for a target is malformed.
    #[error("corrupt record for {target} at {path}: {reason}")]
    Corrupt {
        target: NodeId,
        path: PathBuf,
        reason: String,
    },

    /// The backend answered for a different target than the one asked for.
    #[error("record for {returned} returned when loading {requested}")]
    ForeignRecord { requested: NodeId, returned: NodeId },

    /// The backend refused or failed the operation for another reason.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

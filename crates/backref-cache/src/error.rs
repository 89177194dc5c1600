use std::fmt;

use backref_store::StoreError;
use backref_types::NodeId;
use thiserror::Error;

/// The store operation a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Load,
    Store,
    Destroy,
    Exists,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOp::Load => "load",
            StoreOp::Store => "store",
            StoreOp::Destroy => "destroy",
            StoreOp::Exists => "exists",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the reference cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed; carries the underlying fault.
    #[error("error while trying to {op} references for {target}: {source}")]
    Persistence {
        op: StoreOp,
        target: NodeId,
        #[source]
        source: StoreError,
    },

    /// A thread panicked while holding the cache lock.
    #[error("reference cache lock poisoned")]
    LockPoisoned,

    /// Invalid cache configuration.
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

/// Convenience type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

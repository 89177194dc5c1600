//! Durable storage for backref reference records.
//!
//! A store persists one [`RecordSnapshot`](backref_types::RecordSnapshot) per
//! target node. It never interprets the referrer list; deciding *when* to
//! load, store or destroy is the cache's job.
//!
//! # Storage Backends
//!
//! All backends implement the [`ReferenceStore`] trait:
//!
//! - [`InMemoryReferenceStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileReferenceStore`] -- one checksummed file per target under a root directory
//!
//! # Design Rules
//!
//! 1. A missing record is `Ok(None)`, never an error.
//! 2. `store` overwrites; calling it repeatedly for one target is safe.
//! 3. `destroy` of a missing record succeeds.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileReferenceStore, FileStoreConfig};
pub use memory::InMemoryReferenceStore;
pub use traits::ReferenceStore;

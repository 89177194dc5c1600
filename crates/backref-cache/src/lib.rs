//! Write-through cache for reference records.
//!
//! [`ReferenceCache`] keeps the in-memory view of "who points at this node"
//! consistent with a [`ReferenceStore`](backref_store::ReferenceStore). It
//! decides when to trust its own entries, when to load, when to persist, and
//! when a record with no referrers left has to be deleted instead.
//!
//! # Guarantees
//!
//! 1. Identifiers are canonicalized before use, so qualified targets naming
//!    one node share a single entry.
//! 2. A target missing from the store yields an empty record; nothing is
//!    written until that record is saved with referrers.
//! 3. Saving an empty record destroys the persisted one and drops the entry.
//! 4. A failed load never leaves an entry behind.
//! 5. Entries dropped by the [`RetentionPolicy`] reload transparently;
//!    only [`ReferenceCache::remove`] deletes persisted data.
//!
//! # Modules
//!
//! - [`cache`] -- [`ReferenceCache`] itself
//! - [`config`] -- [`CacheConfig`] and [`RetentionPolicy`]
//! - [`error`] -- [`CacheError`] and the [`StoreOp`] a failure came from
//! - [`stats`] -- [`CacheStats`] counters

pub mod cache;
pub mod config;
pub mod error;
pub mod stats;
mod table;

#[cfg(test)]
mod testing;

pub use cache::ReferenceCache;
pub use config::{CacheConfig, RetentionPolicy};
pub use error::{CacheError, CacheResult, StoreOp};
pub use stats::CacheStats;

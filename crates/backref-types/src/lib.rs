//! Foundation types for backref.
//!
//! This crate provides the identity and record types shared by every other
//! backref crate: the stores persist [`ReferenceRecord`]s, and the cache keys
//! them by canonical [`NodeId`].
//!
//! # Key Types
//!
//! - [`NodeId`] -- Canonical, identity-only node identifier (UUID)
//! - [`TargetId`] -- Caller-facing identifier: a node id plus optional auxiliary data
//! - [`PropertyId`] -- A referrer: the property on some node that points at a target
//! - [`ReferenceRecord`] -- The shared, mutable set of referrers for one target
//! - [`RecordSnapshot`] -- Plain-data copy of a record, used for persistence

pub mod error;
pub mod identity;
pub mod property;
pub mod record;

pub use error::TypeError;
pub use identity::{NodeId, TargetId};
pub use property::PropertyId;
pub use record::{RecordSnapshot, ReferenceRecord};

use thiserror::Error;

/// Errors produced while parsing or constructing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid node id {input:?}: {reason}")]
    InvalidNodeId { input: String, reason: String },

    #[error("invalid property name {name:?}: {reason}")]
    InvalidPropertyName { name: String, reason: String },

    #[error("invalid property id {0:?}: expected <uuid>/<name>")]
    InvalidPropertyId(String),
}

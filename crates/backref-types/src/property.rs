//! Referrer identifiers.
//!
//! A [`PropertyId`] names the property that holds a reference: the node that
//! owns it plus the property's name. Valid names:
//! - Must be non-empty
//! - Must not contain `/` (it separates node and name in the text form)
//! - Must not contain whitespace or control characters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::NodeId;

/// A referencing property: `<parent node>/<name>`.
///
/// Deserialization runs the same name checks as [`PropertyId::new`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPropertyId")]
pub struct PropertyId {
    parent: NodeId,
    name: String,
}

#[derive(Deserialize)]
struct RawPropertyId {
    parent: NodeId,
    name: String,
}

impl TryFrom<RawPropertyId> for PropertyId {
    type Error = TypeError;

    fn try_from(raw: RawPropertyId) -> Result<Self, Self::Error> {
        Self::new(raw.parent, raw.name)
    }
}

impl PropertyId {
    /// Create a property id, validating the name.
    pub fn new(parent: NodeId, name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_property_name(&name)?;
        Ok(Self { parent, name })
    }

    /// The node owning the property.
    pub fn parent(&self) -> &NodeId {
        &self.parent
    }

    /// The property name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.name)
    }
}

impl FromStr for PropertyId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (parent, name) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidPropertyId(s.to_string()))?;
        Self::new(parent.parse()?, name)
    }
}

/// Validate a property name, returning `Ok(())` if valid.
pub fn validate_property_name(name: &str) -> Result<(), TypeError> {
    let reject = |reason: &str| {
        Err(TypeError::InvalidPropertyName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("must not be empty");
    }
    if name.contains('/') {
        return reject("must not contain '/'");
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return reject("must not contain whitespace or control characters");
    }
    Ok(())
}

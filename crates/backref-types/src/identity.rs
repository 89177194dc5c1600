use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Separator between a node id and the caller's qualifier in the text form
/// of a [`TargetId`].
const QUALIFIER_SEPARATOR: char = '#';

/// Canonical identity of a node.
///
/// A `NodeId` carries nothing but the node's UUID. It is the form used as a
/// cache key and handed to stores, so two identifiers that name the same node
/// always compare equal here regardless of what the caller attached to them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    uuid: Uuid,
}

impl NodeId {
    /// Create a fresh, time-ordered (UUID v7) node id.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::now_v7(),
        }
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self { uuid }
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.uuid
    }

    /// Lowercase hex without hyphens (32 characters).
    pub fn to_hex(&self) -> String {
        self.uuid.simple().to_string()
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        let hex = self.to_hex();
        hex[..8].to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s.trim()).map_err(|e| TypeError::InvalidNodeId {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { uuid })
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short_id())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid.hyphenated())
    }
}

/// Identifier supplied by callers when asking about a referenced node.
///
/// Besides the node itself a `TargetId` may carry a `qualifier`: auxiliary
/// data such as a path hint that is meaningful to the caller but not part of
/// the node's identity. Equality and hashing consider both parts, so use
/// [`TargetId::canonical`] whenever identity matters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId {
    node: NodeId,
    qualifier: Option<String>,
}

impl TargetId {
    /// A target with no auxiliary data.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            qualifier: None,
        }
    }

    /// A target carrying a caller-defined qualifier.
    pub fn qualified(node: NodeId, qualifier: impl Into<String>) -> Self {
        Self {
            node,
            qualifier: Some(qualifier.into()),
        }
    }

    /// The node this target names.
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Auxiliary data attached by the caller, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Strip everything but identity.
    pub fn canonical(&self) -> NodeId {
        self.node
    }
}

impl From<NodeId> for TargetId {
    fn from(node: NodeId) -> Self {
        Self::new(node)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}{QUALIFIER_SEPARATOR}{q}", self.node),
            None => write!(f, "{}", self.node),
        }
    }
}

impl FromStr for TargetId {
    type Err = TypeError;

    /// Parse `<uuid>` or `<uuid>#<qualifier>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(QUALIFIER_SEPARATOR) {
            None => Ok(Self::new(s.parse()?)),
            Some((_, "")) => Err(TypeError::InvalidNodeId {
                input: s.to_string(),
                reason: "empty qualifier".into(),
            }),
            Some((node, qualifier)) => Ok(Self::qualified(node.parse()?, qualifier)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "0190c6f4-5b3a-7c2e-9d41-2f6e8a1b3c4d";

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(NodeId::new(), NodeId::new());
    }

    #[test]
    fn parse_and_display() {
        let id: NodeId = SAMPLE.parse().unwrap();
        assert_eq!(id.to_string(), SAMPLE);
        assert_eq!(id.to_hex(), SAMPLE.replace('-', ""));
        assert_eq!(id.short_id(), "0190c6f4");
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<NodeId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidNodeId { .. }));
    }

    #[test]
    fn target_parse_with_qualifier() {
        let target: TargetId = format!("{SAMPLE}#/content/page").parse().unwrap();
        assert_eq!(target.qualifier(), Some("/content/page"));
        assert_eq!(target.canonical().to_string(), SAMPLE);
        assert_eq!(target.to_string(), format!("{SAMPLE}#/content/page"));
    }

    #[test]
    fn target_parse_rejects_empty_qualifier() {
        assert!(format!("{SAMPLE}#").parse::<TargetId>().is_err());
    }

    #[test]
    fn qualified_targets_differ_but_share_identity() {
        let node = NodeId::new();
        let a = TargetId::qualified(node, "a");
        let b = TargetId::qualified(node, "b");
        assert_ne!(a, b);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(TargetId::from(node).canonical(), node);
    }

    #[test]
    fn serde_json_form() {
        let id: NodeId = SAMPLE.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains(SAMPLE));
    }

    proptest! {
        #[test]
        fn canonical_ignores_qualifier(bytes in any::<[u8; 16]>(), q in "[a-z/]{1,12}") {
            let node = NodeId::from_uuid(Uuid::from_bytes(bytes));
            let target = TargetId::qualified(node, q.clone());
            prop_assert_eq!(target.canonical(), node);

            let reparsed: TargetId = target.to_string().parse().unwrap();
            prop_assert_eq!(reparsed.qualifier(), Some(q.as_str()));
            prop_assert_eq!(reparsed.canonical(), node);
        }
    }
}

//! Nodespace: hierarchical grouping container for nodes and nodespaces.

use serde::{Deserialize, Serialize};

use super::NodespaceId;

/// A grouping container in the nodespace tree.
///
/// The containment graph is a tree: exactly one root per nodenet (the root's
/// `parent` is `None`) and no cycles. Child nodes and nodespaces are computed
/// by the owning nodenet, not stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nodespace {
    /// Unique nodespace id.
    pub uid: NodespaceId,
    /// Display name; the root is conventionally named "Root".
    pub name: String,
    /// Parent nodespace, `None` for the root.
    pub parent: Option<NodespaceId>,
}

impl Nodespace {
    /// Creates a nodespace under the given parent.
    pub fn new(uid: NodespaceId, name: impl Into<String>, parent: Option<NodespaceId>) -> Self {
        Self {
            uid,
            name: name.into(),
            parent,
        }
    }

    /// True for the tree root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Snapshot of a nodespace as exposed to external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodespaceData {
    pub uid: NodespaceId,
    pub name: String,
    pub parent: Option<NodespaceId>,
}

impl From<&Nodespace> for NodespaceData {
    fn from(ns: &Nodespace) -> Self {
        Self {
            uid: ns.uid,
            name: ns.name.clone(),
            parent: ns.parent,
        }
    }
}

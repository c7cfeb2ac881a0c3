//! Link: a directed, weighted edge from a gate to a slot.

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Identity of a link: its four endpoint coordinates.
///
/// At most one link exists per (source node, source gate, target node,
/// target slot) tuple; re-linking the same endpoints overwrites weight and
/// certainty instead of duplicating the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId {
    pub source_node: NodeId,
    pub source_gate: String,
    pub target_node: NodeId,
    pub target_slot: String,
}

/// A directed edge from a source gate to a target slot.
///
/// Links always reference live nodes holding the named gate/slot types;
/// deleting a node removes every link touching it, so dangling links are
/// never observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Id of the node the link originates from.
    pub source_node: NodeId,
    /// Gate type on the source node.
    pub source_gate: String,
    /// Id of the node the link points to.
    pub target_node: NodeId,
    /// Slot type on the target node.
    pub target_slot: String,
    /// Scalar weight applied to the source gate's activation.
    pub weight: f64,
    /// Optional certainty annotation, `1.0` by default.
    pub certainty: f64,
}

impl Link {
    /// Creates a link with the given weight and certainty.
    pub fn new(
        source_node: NodeId,
        source_gate: impl Into<String>,
        target_node: NodeId,
        target_slot: impl Into<String>,
        weight: f64,
        certainty: f64,
    ) -> Self {
        Self {
            source_node,
            source_gate: source_gate.into(),
            target_node,
            target_slot: target_slot.into(),
            weight,
            certainty,
        }
    }

    /// This link's identity tuple.
    pub fn id(&self) -> LinkId {
        LinkId {
            source_node: self.source_node,
            source_gate: self.source_gate.clone(),
            target_node: self.target_node,
            target_slot: self.target_slot.clone(),
        }
    }
}

/// View of an outgoing link as exposed in node-data snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkData {
    /// Target node of the link.
    pub target_node_uid: NodeId,
    /// Slot type on the target node.
    pub target_slot: String,
    /// Link weight.
    pub weight: f64,
    /// Link certainty.
    pub certainty: f64,
}

impl From<&Link> for LinkData {
    fn from(link: &Link) -> Self {
        Self {
            target_node_uid: link.target_node,
            target_slot: link.target_slot.clone(),
            weight: link.weight,
            certainty: link.certainty,
        }
    }
}

/// Named reciprocal-link relations.
///
/// Each relation maps to a (forward, backward) pair of gate/slot type names:
/// linking `a` and `b` with [`Relation::SubSur`] creates `a.sub → b.sub` and
/// `b.sur → a.sur`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Part-whole: `sub` forward, `sur` backward.
    SubSur,
    /// Succession: `por` forward, `ret` backward.
    PorRet,
    /// Categorization: `cat` forward, `exp` backward.
    CatExp,
}

impl Relation {
    /// Parses the relation names used by external callers.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "subsur" => Some(Relation::SubSur),
            "porret" => Some(Relation::PorRet),
            "catexp" => Some(Relation::CatExp),
            _ => None,
        }
    }

    /// Gate/slot type name of the forward link.
    pub fn forward(&self) -> &'static str {
        match self {
            Relation::SubSur => "sub",
            Relation::PorRet => "por",
            Relation::CatExp => "cat",
        }
    }

    /// Gate/slot type name of the backward link.
    pub fn backward(&self) -> &'static str {
        match self {
            Relation::SubSur => "sur",
            Relation::PorRet => "ret",
            Relation::CatExp => "exp",
        }
    }
}

//! Bounded-window change log for incremental external synchronization.
//!
//! Records, per step index, which node/nodespace ids were created or mutated
//! and which were deleted, so a viewer that last synchronized at step `k` can
//! fetch exactly the delta. Deleted-id memory is bounded: once
//! [`DELETION_RETENTION_STEPS`] ticks have elapsed, the id silently drops out
//! of future deleted-sets (the consumer is assumed to have synchronized).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{NodeData, NodeId, NodespaceData, NodespaceId};

/// How many subsequent ticks a deletion stays reported.
pub const DELETION_RETENTION_STEPS: u64 = 100;

/// One recorded deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// The deleted id.
    pub uid: uuid::Uuid,
    /// Step counter value at deletion time.
    pub step: u64,
    /// Nodespace the entity lived in, for per-nodespace filtering.
    pub parent_nodespace: NodespaceId,
}

/// Dirty/deleted bookkeeping of one nodenet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    dirty_nodes: HashMap<NodeId, u64>,
    dirty_nodespaces: HashMap<NodespaceId, u64>,
    deleted_nodes: Vec<DeletionRecord>,
    deleted_nodespaces: Vec<DeletionRecord>,
}

impl ChangeLog {
    /// Marks a node created or mutated at the given step.
    pub fn mark_node_dirty(&mut self, uid: NodeId, step: u64) {
        self.dirty_nodes.insert(uid, step);
    }

    /// Marks a nodespace created or mutated at the given step.
    pub fn mark_nodespace_dirty(&mut self, uid: NodespaceId, step: u64) {
        self.dirty_nodespaces.insert(uid, step);
    }

    /// Records a node deletion; the node stops being reported dirty.
    pub fn record_node_deleted(&mut self, uid: NodeId, step: u64, parent: NodespaceId) {
        self.dirty_nodes.remove(&uid);
        self.deleted_nodes.push(DeletionRecord {
            uid,
            step,
            parent_nodespace: parent,
        });
    }

    /// Records a nodespace deletion.
    pub fn record_nodespace_deleted(&mut self, uid: NodespaceId, step: u64, parent: NodespaceId) {
        self.dirty_nodespaces.remove(&uid);
        self.deleted_nodespaces.push(DeletionRecord {
            uid,
            step,
            parent_nodespace: parent,
        });
    }

    /// Drops deletion records outside the retention window. Called once per
    /// tick by the step pipeline; this is what bounds the log's memory.
    pub fn prune(&mut self, current_step: u64) {
        let keep = |record: &DeletionRecord| {
            current_step.saturating_sub(record.step) <= DELETION_RETENTION_STEPS
        };
        self.deleted_nodes.retain(keep);
        self.deleted_nodespaces.retain(keep);
    }

    /// Node ids dirty at or after `from_step`.
    pub fn nodes_dirty_since(&self, from_step: u64) -> impl Iterator<Item = NodeId> + '_ {
        self.dirty_nodes
            .iter()
            .filter(move |(_, step)| **step >= from_step)
            .map(|(uid, _)| *uid)
    }

    /// Nodespace ids dirty at or after `from_step`.
    pub fn nodespaces_dirty_since(&self, from_step: u64) -> impl Iterator<Item = NodespaceId> + '_ {
        self.dirty_nodespaces
            .iter()
            .filter(move |(_, step)| **step >= from_step)
            .map(|(uid, _)| *uid)
    }

    /// Node deletions at or after `from_step` that are still within the
    /// retention window.
    pub fn nodes_deleted_since(&self, from_step: u64) -> impl Iterator<Item = &DeletionRecord> {
        self.deleted_nodes
            .iter()
            .filter(move |record| record.step >= from_step)
    }

    /// Nodespace deletions at or after `from_step` still within retention.
    pub fn nodespaces_deleted_since(
        &self,
        from_step: u64,
    ) -> impl Iterator<Item = &DeletionRecord> {
        self.deleted_nodespaces
            .iter()
            .filter(move |record| record.step >= from_step)
    }
}

/// The delta reported to an external viewer for a set of nodespaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodespaceChanges {
    /// Nodes created or mutated since the queried step, as full snapshots.
    pub nodes_dirty: HashMap<NodeId, NodeData>,
    /// Nodes deleted since the queried step (bounded retention).
    pub nodes_deleted: Vec<NodeId>,
    /// Nodespaces created or mutated since the queried step.
    pub nodespaces_dirty: HashMap<NodespaceId, NodespaceData>,
    /// Nodespaces deleted since the queried step (bounded retention).
    pub nodespaces_deleted: Vec<NodespaceId>,
    /// False when two consecutive identical-state queries see no mutation.
    pub has_changes: bool,
}

/// Activation snapshot plus change marker, for incremental renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationData {
    /// Per-node gate activations in the queried nodespaces.
    pub activations: HashMap<NodeId, Vec<f64>>,
    /// Whether structural changes occurred since the queried step.
    pub has_changes: bool,
}

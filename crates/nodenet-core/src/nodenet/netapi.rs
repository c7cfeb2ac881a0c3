//! NetAPI: the sole mutation surface of a nodenet.
//!
//! Every operation validates that referenced ids exist and belong to this
//! nodenet; unknown-id errors are reported, never swallowed. The one
//! idempotent exception is [`Nodenet::unlink`], which tolerates a missing
//! link (but still reports missing nodes).

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Link, Node, NodeId, Nodespace, NodespaceId, Relation};

use super::Nodenet;

impl Nodenet {
    // ---------------------------------------------------------------------
    // Node creation
    // ---------------------------------------------------------------------

    /// Instantiates a node of a registered type with default parameters,
    /// inside the given nodespace (`None` = root).
    pub fn create_node(
        &mut self,
        type_name: &str,
        nodespace: Option<NodespaceId>,
        name: Option<&str>,
    ) -> CoreResult<NodeId> {
        self.create_node_detailed(type_name, nodespace, name, None, &HashMap::new())
    }

    /// Node creation with explicit position and caller-supplied parameters.
    ///
    /// Supplied parameters are checked against the type's declared
    /// enumerations; empty-string values fall back to the declared default.
    pub fn create_node_detailed(
        &mut self,
        type_name: &str,
        nodespace: Option<NodespaceId>,
        name: Option<&str>,
        position: Option<[f64; 3]>,
        parameters: &HashMap<String, Value>,
    ) -> CoreResult<NodeId> {
        let nodetype = self
            .registry
            .get(type_name)
            .ok_or_else(|| CoreError::UnknownNodeType(type_name.to_string()))?;
        let parent = self.resolve_nodespace(nodespace)?;
        let merged = nodetype.initial_parameters(parameters)?;

        let uid = Uuid::new_v4();
        let mut node = Node::new(
            uid,
            &nodetype,
            parent,
            position.unwrap_or([0.0; 3]),
            name.map(str::to_string),
        );
        node.parameters = merged;
        self.nodes.insert(uid, node);
        self.touch_node(uid);
        tracing::debug!(node = %uid, nodetype = type_name, "created node");
        Ok(uid)
    }

    // ---------------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------------

    /// Creates (or overwrites) the single link between a source gate and a
    /// target slot. Re-linking the same endpoints replaces weight and
    /// certainty rather than duplicating the edge.
    pub fn link(
        &mut self,
        source_node: NodeId,
        gate_type: &str,
        target_node: NodeId,
        slot_type: &str,
        weight: f64,
        certainty: f64,
    ) -> CoreResult<Link> {
        let source = self.get_node(source_node)?;
        if source.get_gate(gate_type).is_none() {
            return Err(CoreError::UnknownGateType {
                node: source_node,
                gate: gate_type.to_string(),
            });
        }
        let target = self.get_node(target_node)?;
        if target.get_slot(slot_type).is_none() {
            return Err(CoreError::UnknownSlotType {
                node: target_node,
                slot: slot_type.to_string(),
            });
        }

        let link = Link::new(
            source_node,
            gate_type,
            target_node,
            slot_type,
            weight,
            certainty,
        );
        let id = link.id();
        let existed = self.links.insert(id.clone(), link.clone()).is_some();
        if !existed {
            if let Some(node) = self.nodes.get_mut(&source_node) {
                if let Some(gate) = node.get_gate_mut(gate_type) {
                    gate.outgoing.push(id.clone());
                }
            }
            if let Some(node) = self.nodes.get_mut(&target_node) {
                if let Some(slot) = node.get_slot_mut(slot_type) {
                    slot.incoming.push(id);
                }
            }
        }
        self.touch_node(source_node);
        self.touch_node(target_node);
        Ok(link)
    }

    /// Creates a matched pair of opposite-direction links according to the
    /// fixed relation table (e.g. `subsur` yields a sub-link and its
    /// sur-link). Fails if either node lacks the required gate/slot types.
    pub fn link_with_reciprocal(
        &mut self,
        node_a: NodeId,
        node_b: NodeId,
        relation: Relation,
    ) -> CoreResult<(Link, Link)> {
        let forward_type = relation.forward();
        let backward_type = relation.backward();
        let forward = self.link(node_a, forward_type, node_b, forward_type, 1.0, 1.0)?;
        let backward = self.link(node_b, backward_type, node_a, backward_type, 1.0, 1.0)?;
        Ok((forward, backward))
    }

    /// Removes a specific link if present; a missing link is a no-op, a
    /// missing node is still an error.
    pub fn unlink(
        &mut self,
        source_node: NodeId,
        gate_type: &str,
        target_node: NodeId,
        slot_type: &str,
    ) -> CoreResult<()> {
        self.get_node(source_node)?;
        self.get_node(target_node)?;
        let id = crate::types::LinkId {
            source_node,
            source_gate: gate_type.to_string(),
            target_node,
            target_slot: slot_type.to_string(),
        };
        if self.links.remove(&id).is_none() {
            return Ok(());
        }
        if let Some(node) = self.nodes.get_mut(&source_node) {
            if let Some(gate) = node.get_gate_mut(gate_type) {
                gate.outgoing.retain(|l| l != &id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&target_node) {
            if let Some(slot) = node.get_slot_mut(slot_type) {
                slot.incoming.retain(|l| l != &id);
            }
        }
        self.touch_node(source_node);
        self.touch_node(target_node);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Deletion
    // ---------------------------------------------------------------------

    /// Removes a node and, atomically, every link touching it. A second
    /// deletion of the same id fails with a not-found error.
    pub fn delete_node(&mut self, uid: NodeId) -> CoreResult<()> {
        let node = self
            .nodes
            .remove(&uid)
            .ok_or_else(|| CoreError::node_not_found(uid))?;

        let mut touching = Vec::new();
        for gate in node.gates.values() {
            touching.extend(gate.outgoing.iter().cloned());
        }
        for slot in node.slots.values() {
            touching.extend(slot.incoming.iter().cloned());
        }

        for id in touching {
            self.links.remove(&id);
            if id.source_node != uid {
                if let Some(other) = self.nodes.get_mut(&id.source_node) {
                    if let Some(gate) = other.get_gate_mut(&id.source_gate) {
                        gate.outgoing.retain(|l| l != &id);
                    }
                }
                self.touch_node(id.source_node);
            }
            if id.target_node != uid {
                if let Some(other) = self.nodes.get_mut(&id.target_node) {
                    if let Some(slot) = other.get_slot_mut(&id.target_slot) {
                        slot.incoming.retain(|l| l != &id);
                    }
                }
                self.touch_node(id.target_node);
            }
        }

        self.changelog
            .record_node_deleted(uid, self.current_step, node.parent_nodespace);
        tracing::debug!(node = %uid, "deleted node");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Nodespaces
    // ---------------------------------------------------------------------

    /// Creates a nodespace under the given parent (`None` = root).
    pub fn create_nodespace(
        &mut self,
        parent: Option<NodespaceId>,
        name: &str,
    ) -> CoreResult<NodespaceId> {
        let parent_uid = self.resolve_nodespace(parent)?;
        let uid = Uuid::new_v4();
        self.nodespaces
            .insert(uid, Nodespace::new(uid, name, Some(parent_uid)));
        self.changelog.mark_nodespace_dirty(uid, self.current_step);
        tracing::debug!(nodespace = %uid, name, "created nodespace");
        Ok(uid)
    }

    /// Deletes a nodespace, cascading through all descendant nodespaces and
    /// every node they contain. The root cannot be deleted.
    pub fn delete_nodespace(&mut self, uid: NodespaceId) -> CoreResult<()> {
        if !self.nodespaces.contains_key(&uid) {
            return Err(CoreError::nodespace_not_found(uid));
        }
        if uid == self.root_nodespace {
            return Err(CoreError::Validation {
                field: "nodespace".into(),
                message: "the root nodespace cannot be deleted".into(),
            });
        }

        // Transitive closure of contained nodespaces.
        let mut doomed = vec![uid];
        let mut queue = vec![uid];
        while let Some(current) = queue.pop() {
            for ns in self.nodespaces.values() {
                if ns.parent == Some(current) && !doomed.contains(&ns.uid) {
                    doomed.push(ns.uid);
                    queue.push(ns.uid);
                }
            }
        }

        let node_ids: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| doomed.contains(&n.parent_nodespace))
            .map(|n| n.uid)
            .collect();
        for node_id in node_ids {
            self.delete_node(node_id)?;
        }

        for space_id in doomed {
            if let Some(space) = self.nodespaces.remove(&space_id) {
                self.nodespace_ui_properties.remove(&space_id);
                self.changelog.record_nodespace_deleted(
                    space_id,
                    self.current_step,
                    space.parent.unwrap_or(self.root_nodespace),
                );
            }
        }
        tracing::debug!(nodespace = %uid, "deleted nodespace subtree");
        Ok(())
    }

    /// Moves a nodespace under a new parent. Rejects moves that would make
    /// the containment graph cyclic and any reparenting of the root.
    pub fn reparent_nodespace(
        &mut self,
        uid: NodespaceId,
        new_parent: Option<NodespaceId>,
    ) -> CoreResult<()> {
        if !self.nodespaces.contains_key(&uid) {
            return Err(CoreError::nodespace_not_found(uid));
        }
        if uid == self.root_nodespace {
            return Err(CoreError::Validation {
                field: "nodespace".into(),
                message: "the root nodespace cannot be reparented".into(),
            });
        }
        let parent_uid = self.resolve_nodespace(new_parent)?;

        // Walk up from the new parent; hitting `uid` would close a cycle.
        let mut cursor = Some(parent_uid);
        while let Some(current) = cursor {
            if current == uid {
                return Err(CoreError::Validation {
                    field: "nodespace".into(),
                    message: "reparenting would create a containment cycle".into(),
                });
            }
            cursor = self.nodespaces.get(&current).and_then(|ns| ns.parent);
        }

        if let Some(space) = self.nodespaces.get_mut(&uid) {
            space.parent = Some(parent_uid);
        }
        self.changelog.mark_nodespace_dirty(uid, self.current_step);
        Ok(())
    }

    /// Moves a node into another nodespace.
    pub fn move_node(&mut self, uid: NodeId, nodespace: Option<NodespaceId>) -> CoreResult<()> {
        let parent = self.resolve_nodespace(nodespace)?;
        let node = self.get_node_mut(uid)?;
        node.parent_nodespace = parent;
        self.touch_node(uid);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Node attributes
    // ---------------------------------------------------------------------

    /// Sets a node parameter, validated against the type's declared value
    /// enumeration. An empty-string value reverts to the declared default
    /// (or unsets the parameter when no default exists).
    pub fn set_node_parameter(
        &mut self,
        uid: NodeId,
        name: &str,
        value: Value,
    ) -> CoreResult<()> {
        let type_name = self.get_node(uid)?.node_type.clone();
        let nodetype = self.registry.get(&type_name);

        if value.as_str().is_some_and(|s| s.is_empty()) {
            let default = nodetype.and_then(|nt| nt.parameter_defaults.get(name).cloned());
            let node = self.get_node_mut(uid)?;
            match default {
                Some(default) => {
                    node.parameters.insert(name.to_string(), default);
                }
                None => node.clear_parameter(name),
            }
        } else {
            if let Some(nodetype) = nodetype {
                nodetype.check_parameter_value(name, &value)?;
            }
            let node = self.get_node_mut(uid)?;
            node.parameters.insert(name.to_string(), value);
        }
        self.touch_node(uid);
        Ok(())
    }

    /// Renames a node.
    pub fn set_node_name(&mut self, uid: NodeId, name: &str) -> CoreResult<()> {
        self.get_node_mut(uid)?.name = name.to_string();
        self.touch_node(uid);
        Ok(())
    }

    /// Moves a node's UI position.
    pub fn set_node_position(&mut self, uid: NodeId, position: [f64; 3]) -> CoreResult<()> {
        self.get_node_mut(uid)?.position = position;
        self.touch_node(uid);
        Ok(())
    }
}

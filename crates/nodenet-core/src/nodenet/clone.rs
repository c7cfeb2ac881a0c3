//! Cloning a set of nodes with configurable link handling.

use std::collections::{HashMap, HashSet};

use crate::error::CoreResult;
use crate::types::{Link, NodeData, NodeId, NodespaceId};

use super::Nodenet;

/// How links touching the cloned selection are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    /// Clone the nodes only.
    None,
    /// Recreate links between clones where both endpoints were selected.
    Internal,
    /// Like `Internal`, plus links between a clone and the original
    /// unselected partner node.
    All,
}

impl LinkScope {
    /// Parses the scope names used by external callers.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "none" => Some(LinkScope::None),
            "internal" => Some(LinkScope::Internal),
            "all" => Some(LinkScope::All),
            _ => None,
        }
    }
}

impl Nodenet {
    /// Clones the given nodes, each into the target nodespace when one is
    /// given, otherwise into the nodespace of its source node.
    ///
    /// Clones keep name, type and parameters; positions are shifted by
    /// `offset`; activations start at zero. Links are recreated according
    /// to `scope`.
    ///
    /// The result maps each requested id to the snapshot of its clone (the
    /// clone's own uid is inside the snapshot). With [`LinkScope::All`],
    /// unselected link partners additionally appear under their own id so a
    /// consumer sees both endpoints of every recreated link. Any unknown
    /// requested id fails the whole call before a single clone is made.
    pub fn clone_nodes(
        &mut self,
        uids: &[NodeId],
        scope: LinkScope,
        nodespace: Option<NodespaceId>,
        offset: [f64; 3],
    ) -> CoreResult<HashMap<NodeId, NodeData>> {
        let explicit_target = match nodespace {
            Some(uid) => Some(self.resolve_nodespace(Some(uid))?),
            None => None,
        };
        for uid in uids {
            self.get_node(*uid)?;
        }
        let selection: HashSet<NodeId> = uids.iter().copied().collect();

        let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
        for &old in uids {
            let (type_name, name, position, parameters, source_space) = {
                let node = self.get_node(old)?;
                (
                    node.node_type.clone(),
                    node.name.clone(),
                    node.position,
                    node.parameters.clone(),
                    node.parent_nodespace,
                )
            };
            let parent = explicit_target.unwrap_or(source_space);
            let shifted = [
                position[0] + offset[0],
                position[1] + offset[1],
                position[2] + offset[2],
            ];
            let clone = self.create_node_detailed(
                &type_name,
                Some(parent),
                Some(&name),
                Some(shifted),
                &parameters,
            )?;
            mapping.insert(old, clone);
        }

        let mut followups: HashSet<NodeId> = HashSet::new();
        if scope != LinkScope::None {
            let links: Vec<Link> = self.links.values().cloned().collect();
            for link in links {
                let source_selected = selection.contains(&link.source_node);
                let target_selected = selection.contains(&link.target_node);
                if source_selected && target_selected {
                    self.link(
                        mapping[&link.source_node],
                        &link.source_gate,
                        mapping[&link.target_node],
                        &link.target_slot,
                        link.weight,
                        link.certainty,
                    )?;
                } else if scope == LinkScope::All && source_selected {
                    self.link(
                        mapping[&link.source_node],
                        &link.source_gate,
                        link.target_node,
                        &link.target_slot,
                        link.weight,
                        link.certainty,
                    )?;
                    followups.insert(link.target_node);
                } else if scope == LinkScope::All && target_selected {
                    self.link(
                        link.source_node,
                        &link.source_gate,
                        mapping[&link.target_node],
                        &link.target_slot,
                        link.weight,
                        link.certainty,
                    )?;
                    followups.insert(link.source_node);
                }
            }
        }

        let mut result = HashMap::new();
        for (&old, &clone) in &mapping {
            result.insert(old, self.get_node_data(clone)?);
        }
        for uid in followups {
            result.insert(uid, self.get_node_data(uid)?);
        }
        tracing::debug!(cloned = mapping.len(), "cloned nodes");
        Ok(result)
    }
}

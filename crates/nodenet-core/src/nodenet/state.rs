//! Serializable full state of a nodenet.
//!
//! Links live in the snapshot as a plain list; the runtime's id-keyed link
//! map is rebuilt on restore. World bindings are not part of the state, the
//! owning runtime re-binds adapters by their registered name.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::changelog::ChangeLog;
use crate::modulators::ModulatorStore;
use crate::nodetype::NodetypeRegistry;
use crate::types::{Link, Node, NodeId, NodenetId, Nodespace, NodespaceId};

use super::{step, Nodenet, UserPrompt};

/// Everything needed to reconstruct a nodenet, minus the world binding and
/// the nodetype registry (both owned by the runtime).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodenetState {
    pub uid: NodenetId,
    pub name: String,
    pub owner: String,
    pub current_step: u64,
    pub nodes: HashMap<NodeId, Node>,
    pub links: Vec<Link>,
    pub nodespaces: HashMap<NodespaceId, Nodespace>,
    pub root_nodespace: NodespaceId,
    pub modulators: ModulatorStore,
    pub changelog: ChangeLog,
    pub worldadapter_name: Option<String>,
    pub user_prompt: Option<UserPrompt>,
    pub nodespace_ui_properties: HashMap<NodespaceId, HashMap<String, Value>>,
    /// Timestamp of the snapshot.
    pub saved_at: DateTime<Utc>,
}

impl Nodenet {
    /// Captures the complete persistent state.
    pub fn snapshot(&self) -> NodenetState {
        NodenetState {
            uid: self.uid(),
            name: self.name().to_string(),
            owner: self.owner().to_string(),
            current_step: self.current_step(),
            nodes: self.nodes.clone(),
            links: self.links.values().cloned().collect(),
            nodespaces: self.nodespaces.clone(),
            root_nodespace: self.root_nodespace(),
            modulators: self.modulators.clone(),
            changelog: self.changelog.clone(),
            worldadapter_name: self.worldadapter_name.clone(),
            user_prompt: self.user_prompt.clone(),
            nodespace_ui_properties: self.nodespace_ui_properties.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Reconstructs a nodenet from a snapshot.
    ///
    /// The operator pipeline is rebuilt from the modulator configuration and
    /// the world binding is left empty; the runtime re-binds the adapter
    /// named in the state afterwards.
    pub fn restore(state: NodenetState, registry: Arc<NodetypeRegistry>) -> Self {
        let links = state
            .links
            .into_iter()
            .map(|link| (link.id(), link))
            .collect();
        let operators = step::default_operators(state.modulators.is_enabled());
        Self {
            uid: state.uid,
            name: state.name,
            owner: state.owner,
            current_step: state.current_step,
            is_active: false,
            nodes: state.nodes,
            links,
            nodespaces: state.nodespaces,
            root_nodespace: state.root_nodespace,
            modulators: state.modulators,
            registry,
            operators,
            world: None,
            worldadapter_name: state.worldadapter_name,
            changelog: state.changelog,
            user_prompt: state.user_prompt,
            nodespace_ui_properties: state.nodespace_ui_properties,
            modulator_snapshot: Default::default(),
            frozen_slots: HashMap::new(),
        }
    }
}

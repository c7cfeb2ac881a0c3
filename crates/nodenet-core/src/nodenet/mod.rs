//! Nodenet: one isolated instance of the graph-computation engine.
//!
//! Owns the graph primitives (flat id-keyed maps of nodes, links and
//! nodespaces), the nodespace tree, the modulator store, the change log and
//! the step-operator pipeline. Distinct nodenets never share mutable state;
//! the only process-wide structure is the runtime registry holding ownership
//! handles.

mod clone;
mod netapi;
mod state;
mod step;

#[cfg(test)]
mod tests_changes;
#[cfg(test)]
mod tests_netapi;
#[cfg(test)]
mod tests_step;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::changelog::{ActivationData, ChangeLog, NodespaceChanges};
use crate::error::{CoreError, CoreResult};
use crate::modulators::ModulatorStore;
use crate::nodetype::NodetypeRegistry;
use crate::types::{
    Link, LinkData, LinkId, Node, NodeData, NodeId, NodenetId, Nodespace, NodespaceData,
    NodespaceId,
};
use crate::world::WorldAdapter;

pub use clone::LinkScope;
pub use state::NodenetState;
pub use step::{ModulatorDecayOperator, PropagationOperator, StepOperator};

/// Creation-time options of a nodenet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodenetConfig {
    /// When false, the modulator store stays empty and no modulator-update
    /// operator is installed in the step pipeline.
    pub use_modulators: bool,
}

impl Default for NodenetConfig {
    fn default() -> Self {
        Self {
            use_modulators: true,
        }
    }
}

/// One choice option of a pending user prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptOption {
    /// Parameter key the answer will be stored under.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Offered values.
    pub values: Vec<Value>,
}

/// A pending, non-blocking user prompt raised by a node.
///
/// Prompts are the sole intentional pause mechanism: the raising node
/// completes its tick normally, and the prompt stays visible until a
/// matching [`Nodenet::user_prompt_response`] arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPrompt {
    /// The node that raised the prompt.
    pub node: NodeId,
    /// Message shown to the user.
    pub msg: String,
    /// Offered parameter options; empty for plain notifications.
    pub options: Vec<PromptOption>,
}

/// Full-state view of a nodenet for external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodenetData {
    pub uid: NodenetId,
    pub name: String,
    pub owner: String,
    pub current_step: u64,
    pub nodes: HashMap<NodeId, NodeData>,
    pub nodespaces: HashMap<NodespaceId, NodespaceData>,
}

/// An isolated stepped graph-computation instance.
pub struct Nodenet {
    uid: NodenetId,
    name: String,
    owner: String,
    current_step: u64,
    is_active: bool,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) links: HashMap<LinkId, Link>,
    pub(crate) nodespaces: HashMap<NodespaceId, Nodespace>,
    root_nodespace: NodespaceId,
    pub(crate) modulators: ModulatorStore,
    pub(crate) registry: Arc<NodetypeRegistry>,
    operators: Vec<Box<dyn StepOperator>>,
    pub(crate) world: Option<Box<dyn WorldAdapter>>,
    worldadapter_name: Option<String>,
    pub(crate) changelog: ChangeLog,
    user_prompt: Option<UserPrompt>,
    nodespace_ui_properties: HashMap<NodespaceId, HashMap<String, Value>>,
    /// Modulator values frozen at tick start, read by sensors and node
    /// functions during the running tick.
    pub(crate) modulator_snapshot: BTreeMap<String, f64>,
    /// Per-node slot inputs frozen at tick start, so computation order
    /// within a tick cannot influence results.
    pub(crate) frozen_slots: HashMap<NodeId, BTreeMap<String, f64>>,
}

impl std::fmt::Debug for Nodenet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nodenet")
            .field("uid", &self.uid)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("current_step", &self.current_step)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("nodespaces", &self.nodespaces.len())
            .finish()
    }
}

impl Nodenet {
    /// Creates an empty nodenet with an implicit root nodespace.
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        registry: Arc<NodetypeRegistry>,
        config: NodenetConfig,
    ) -> Self {
        let root = Nodespace::new(Uuid::new_v4(), "Root", None);
        let root_uid = root.uid;
        let modulators = if config.use_modulators {
            ModulatorStore::with_defaults()
        } else {
            ModulatorStore::disabled()
        };
        let operators = step::default_operators(config.use_modulators);
        Self {
            uid: Uuid::new_v4(),
            name: name.into(),
            owner: owner.into(),
            current_step: 0,
            is_active: false,
            nodes: HashMap::new(),
            links: HashMap::new(),
            nodespaces: [(root_uid, root)].into_iter().collect(),
            root_nodespace: root_uid,
            modulators,
            registry,
            operators,
            world: None,
            worldadapter_name: None,
            changelog: ChangeLog::default(),
            user_prompt: None,
            nodespace_ui_properties: HashMap::new(),
            modulator_snapshot: BTreeMap::new(),
            frozen_slots: HashMap::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Identity & counters
    // ---------------------------------------------------------------------

    pub fn uid(&self) -> NodenetId {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Monotonic step counter, starting at 0.
    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Whether the calculation is flagged as running.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Names of the installed step-operators, in execution order.
    pub fn operator_names(&self) -> Vec<&'static str> {
        self.operators.iter().map(|op| op.name()).collect()
    }

    // ---------------------------------------------------------------------
    // Node & nodespace queries
    // ---------------------------------------------------------------------

    pub fn is_node(&self, uid: NodeId) -> bool {
        self.nodes.contains_key(&uid)
    }

    pub fn is_nodespace(&self, uid: NodespaceId) -> bool {
        self.nodespaces.contains_key(&uid)
    }

    pub fn get_node(&self, uid: NodeId) -> CoreResult<&Node> {
        self.nodes.get(&uid).ok_or_else(|| CoreError::node_not_found(uid))
    }

    pub fn get_node_mut(&mut self, uid: NodeId) -> CoreResult<&mut Node> {
        self.nodes
            .get_mut(&uid)
            .ok_or_else(|| CoreError::node_not_found(uid))
    }

    /// All node ids, in unspecified order.
    pub fn node_uids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// All nodespace ids, root included.
    pub fn nodespace_uids(&self) -> Vec<NodespaceId> {
        self.nodespaces.keys().copied().collect()
    }

    /// The root nodespace id (addressed as `None` on the API surface).
    pub fn root_nodespace(&self) -> NodespaceId {
        self.root_nodespace
    }

    /// Resolves an optional nodespace reference; `None` means the root.
    pub fn resolve_nodespace(&self, nodespace: Option<NodespaceId>) -> CoreResult<NodespaceId> {
        match nodespace {
            None => Ok(self.root_nodespace),
            Some(uid) if self.nodespaces.contains_key(&uid) => Ok(uid),
            Some(uid) => Err(CoreError::nodespace_not_found(uid)),
        }
    }

    pub fn get_nodespace(&self, nodespace: Option<NodespaceId>) -> CoreResult<&Nodespace> {
        let uid = self.resolve_nodespace(nodespace)?;
        self.nodespaces
            .get(&uid)
            .ok_or_else(|| CoreError::nodespace_not_found(uid))
    }

    /// The link at the given endpoint coordinates, if present.
    pub fn get_link(&self, id: &LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    /// All links, in unspecified order.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links originating at the given node, grouped by source gate.
    pub(crate) fn outgoing_link_data(&self, node: &Node) -> BTreeMap<String, Vec<LinkData>> {
        let mut grouped: BTreeMap<String, Vec<LinkData>> = BTreeMap::new();
        for (gate_type, gate) in &node.gates {
            let data: Vec<LinkData> = gate
                .links()
                .iter()
                .filter_map(|id| self.links.get(id))
                .map(LinkData::from)
                .collect();
            if !data.is_empty() {
                grouped.insert(gate_type.clone(), data);
            }
        }
        grouped
    }

    /// Snapshot of one node, including its outgoing links.
    pub fn get_node_data(&self, uid: NodeId) -> CoreResult<NodeData> {
        let node = self.get_node(uid)?;
        Ok(NodeData {
            uid: node.uid,
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            position: node.position,
            parent_nodespace: node.parent_nodespace,
            parameters: node.parameters.clone(),
            gate_activations: node
                .gates
                .iter()
                .map(|(k, g)| (k.clone(), g.activation))
                .collect(),
            is_active: node.is_active,
            links: self.outgoing_link_data(node),
        })
    }

    /// Full-state view of the nodenet.
    pub fn get_data(&self) -> NodenetData {
        let nodes = self
            .nodes
            .keys()
            .filter_map(|uid| self.get_node_data(*uid).ok().map(|d| (*uid, d)))
            .collect();
        let nodespaces = self
            .nodespaces
            .iter()
            .map(|(uid, ns)| (*uid, NodespaceData::from(ns)))
            .collect();
        NodenetData {
            uid: self.uid,
            name: self.name.clone(),
            owner: self.owner.clone(),
            current_step: self.current_step,
            nodes,
            nodespaces,
        }
    }

    // ---------------------------------------------------------------------
    // Modulator access (NetAPI)
    // ---------------------------------------------------------------------

    pub fn get_modulator(&self, name: &str) -> Option<f64> {
        self.modulators.get(name)
    }

    /// Hard overwrite, used for initialization and test setup.
    pub fn set_modulator(&mut self, name: &str, value: f64) {
        self.modulators.set(name, value);
    }

    /// Smoothed update toward `delta`; see
    /// [`MODULATOR_SMOOTHING`](crate::modulators::MODULATOR_SMOOTHING).
    pub fn change_modulator(&mut self, name: &str, delta: f64) {
        self.modulators.change(name, delta);
    }

    pub fn modulators(&self) -> &ModulatorStore {
        &self.modulators
    }

    // ---------------------------------------------------------------------
    // World binding
    // ---------------------------------------------------------------------

    /// Binds a world adapter under the given registered name.
    pub fn bind_world(&mut self, name: impl Into<String>, adapter: Box<dyn WorldAdapter>) {
        self.worldadapter_name = Some(name.into());
        self.world = Some(adapter);
    }

    /// Drops the world binding.
    pub fn unbind_world(&mut self) {
        self.worldadapter_name = None;
        self.world = None;
    }

    /// Name the bound adapter was registered under, if any.
    pub fn worldadapter_name(&self) -> Option<&str> {
        self.worldadapter_name.as_deref()
    }

    pub fn worldadapter(&self) -> Option<&dyn WorldAdapter> {
        self.world.as_deref()
    }

    pub fn worldadapter_mut(&mut self) -> Option<&mut (dyn WorldAdapter + 'static)> {
        self.world.as_deref_mut()
    }

    // ---------------------------------------------------------------------
    // User prompts
    // ---------------------------------------------------------------------

    /// Registers a pending parameter prompt for a node. Non-blocking.
    pub fn ask_user_for_parameter(
        &mut self,
        node: NodeId,
        msg: impl Into<String>,
        options: Vec<PromptOption>,
    ) -> CoreResult<()> {
        self.get_node(node)?;
        self.user_prompt = Some(UserPrompt {
            node,
            msg: msg.into(),
            options,
        });
        Ok(())
    }

    /// Registers a plain notification prompt for a node. Non-blocking.
    pub fn notify_user(&mut self, node: NodeId, msg: impl Into<String>) -> CoreResult<()> {
        self.ask_user_for_parameter(node, msg, Vec::new())
    }

    /// The pending prompt, if any.
    pub fn user_prompt(&self) -> Option<&UserPrompt> {
        self.user_prompt.as_ref()
    }

    /// Delivers a prompt response: stores the answered values in the node's
    /// parameter map out-of-band, clears the prompt and (on `resume`) marks
    /// the nodenet active again.
    pub fn user_prompt_response(
        &mut self,
        node: NodeId,
        values: &HashMap<String, Value>,
        resume: bool,
    ) -> CoreResult<()> {
        for (name, value) in values {
            self.set_node_parameter(node, name, value.clone())?;
        }
        if self.user_prompt.as_ref().map(|p| p.node) == Some(node) {
            self.user_prompt = None;
        }
        if resume {
            self.is_active = true;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Nodespace UI properties
    // ---------------------------------------------------------------------

    /// Replaces the opaque UI property map of a nodespace.
    pub fn set_nodespace_properties(
        &mut self,
        nodespace: Option<NodespaceId>,
        properties: HashMap<String, Value>,
    ) -> CoreResult<()> {
        let uid = self.resolve_nodespace(nodespace)?;
        self.nodespace_ui_properties.insert(uid, properties);
        self.changelog.mark_nodespace_dirty(uid, self.current_step);
        Ok(())
    }

    /// The UI property map of one nodespace (empty if never set).
    pub fn get_nodespace_properties(
        &self,
        nodespace: Option<NodespaceId>,
    ) -> CoreResult<HashMap<String, Value>> {
        let uid = self.resolve_nodespace(nodespace)?;
        Ok(self
            .nodespace_ui_properties
            .get(&uid)
            .cloned()
            .unwrap_or_default())
    }

    /// UI property maps of all nodespaces that have one.
    pub fn all_nodespace_properties(&self) -> &HashMap<NodespaceId, HashMap<String, Value>> {
        &self.nodespace_ui_properties
    }

    // ---------------------------------------------------------------------
    // Change queries
    // ---------------------------------------------------------------------

    fn resolve_nodespace_filter(
        &self,
        nodespaces: &[Option<NodespaceId>],
    ) -> CoreResult<std::collections::HashSet<NodespaceId>> {
        let mut set = std::collections::HashSet::new();
        for reference in nodespaces {
            set.insert(self.resolve_nodespace(*reference)?);
        }
        Ok(set)
    }

    /// The delta of the given nodespaces relative to `from_step`.
    ///
    /// Two consecutive identical-state queries report `has_changes = false`
    /// the second time; deletions older than the retention window are
    /// silently absent.
    pub fn get_nodespace_changes(
        &self,
        nodespaces: &[Option<NodespaceId>],
        from_step: u64,
    ) -> CoreResult<NodespaceChanges> {
        let filter = self.resolve_nodespace_filter(nodespaces)?;

        let mut nodes_dirty = HashMap::new();
        for uid in self.changelog.nodes_dirty_since(from_step) {
            if let Ok(node) = self.get_node(uid) {
                if filter.contains(&node.parent_nodespace) {
                    nodes_dirty.insert(uid, self.get_node_data(uid)?);
                }
            }
        }

        let nodes_deleted: Vec<NodeId> = self
            .changelog
            .nodes_deleted_since(from_step)
            .filter(|record| filter.contains(&record.parent_nodespace))
            .map(|record| record.uid)
            .collect();

        let mut nodespaces_dirty = HashMap::new();
        for uid in self.changelog.nodespaces_dirty_since(from_step) {
            if let Some(ns) = self.nodespaces.get(&uid) {
                let parent_matches = ns.parent.map(|p| filter.contains(&p)).unwrap_or(false);
                if parent_matches || filter.contains(&uid) {
                    nodespaces_dirty.insert(uid, NodespaceData::from(ns));
                }
            }
        }

        let nodespaces_deleted: Vec<NodespaceId> = self
            .changelog
            .nodespaces_deleted_since(from_step)
            .filter(|record| filter.contains(&record.parent_nodespace))
            .map(|record| record.uid)
            .collect();

        let has_changes = !nodes_dirty.is_empty()
            || !nodes_deleted.is_empty()
            || !nodespaces_dirty.is_empty()
            || !nodespaces_deleted.is_empty();

        Ok(NodespaceChanges {
            nodes_dirty,
            nodes_deleted,
            nodespaces_dirty,
            nodespaces_deleted,
            has_changes,
        })
    }

    /// Per-node gate activations in the given nodespaces, plus a marker for
    /// structural changes since `from_step`.
    pub fn get_activation_data(
        &self,
        nodespaces: &[Option<NodespaceId>],
        from_step: u64,
    ) -> CoreResult<ActivationData> {
        let filter = self.resolve_nodespace_filter(nodespaces)?;
        let activations = self
            .nodes
            .values()
            .filter(|node| filter.contains(&node.parent_nodespace))
            .map(|node| {
                (
                    node.uid,
                    node.gates.values().map(|g| g.activation).collect(),
                )
            })
            .collect();
        let changes = self.get_nodespace_changes(nodespaces, from_step)?;
        Ok(ActivationData {
            activations,
            has_changes: changes.has_changes,
        })
    }

    // ---------------------------------------------------------------------
    // Change-log helpers
    // ---------------------------------------------------------------------

    pub(crate) fn touch_node(&mut self, uid: NodeId) {
        self.changelog.mark_node_dirty(uid, self.current_step);
    }
}

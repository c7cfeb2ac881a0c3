//! Node: a typed graph vertex with gates (outputs) and slots (inputs).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::nodetype::Nodetype;

use super::gate::Gate;
use super::link::LinkData;
use super::slot::Slot;
use super::{NodeId, NodespaceId};

/// Gate type every builtin node carries; `Node::activation` is sugar for it.
pub(crate) const GEN: &str = "gen";

/// A typed node in the graph.
///
/// Lives inside exactly one nodespace, carries a schema-validated parameter
/// map and one gate/slot per type its nodetype declares. Destroyed only by
/// explicit deletion, which atomically removes all links touching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id.
    pub uid: NodeId,
    /// Display name.
    pub name: String,
    /// Name of the registered nodetype this node instantiates.
    #[serde(rename = "type")]
    pub node_type: String,
    /// UI position metadata; not interpreted by the engine.
    pub position: [f64; 3],
    /// Id of the owning nodespace.
    pub parent_nodespace: NodespaceId,
    /// Parameter map. Declared parameters are seeded with their defaults;
    /// undeclared entries are permitted for native-module bookkeeping.
    pub parameters: HashMap<String, Value>,
    /// True when any gate fired above epsilon this tick.
    pub is_active: bool,
    pub(crate) gates: BTreeMap<String, Gate>,
    pub(crate) slots: BTreeMap<String, Slot>,
}

impl Node {
    /// Instantiates a node of the given type with default parameters.
    pub(crate) fn new(
        uid: NodeId,
        nodetype: &Nodetype,
        parent_nodespace: NodespaceId,
        position: [f64; 3],
        name: Option<String>,
    ) -> Self {
        let gates = nodetype
            .gatetypes
            .iter()
            .map(|g| (g.clone(), Gate::new(g.clone())))
            .collect();
        let slots = nodetype
            .slottypes
            .iter()
            .map(|s| (s.clone(), Slot::new(s.clone())))
            .collect();
        Self {
            uid,
            name: name.unwrap_or_else(|| nodetype.name.clone()),
            node_type: nodetype.name.clone(),
            position,
            parent_nodespace,
            parameters: nodetype.default_parameters(),
            is_active: false,
            gates,
            slots,
        }
    }

    /// The gate of the given type, if declared.
    pub fn get_gate(&self, gate_type: &str) -> Option<&Gate> {
        self.gates.get(gate_type)
    }

    /// Mutable access to the gate of the given type.
    pub fn get_gate_mut(&mut self, gate_type: &str) -> Option<&mut Gate> {
        self.gates.get_mut(gate_type)
    }

    /// The slot of the given type, if declared.
    pub fn get_slot(&self, slot_type: &str) -> Option<&Slot> {
        self.slots.get(slot_type)
    }

    /// Mutable access to the slot of the given type.
    pub fn get_slot_mut(&mut self, slot_type: &str) -> Option<&mut Slot> {
        self.slots.get_mut(slot_type)
    }

    /// Declared gate type names, in stable order.
    pub fn gate_types(&self) -> impl Iterator<Item = &str> {
        self.gates.keys().map(String::as_str)
    }

    /// Declared slot type names, in stable order.
    pub fn slot_types(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// The node's activation: the `gen` gate's output, `0.0` without one.
    pub fn activation(&self) -> f64 {
        self.gates.get(GEN).map(|g| g.activation).unwrap_or(0.0)
    }

    /// Directly sets the `gen` gate's output activation.
    pub fn set_activation(&mut self, value: f64) -> CoreResult<()> {
        match self.gates.get_mut(GEN) {
            Some(gate) => {
                gate.activation = value;
                Ok(())
            }
            None => Err(CoreError::UnknownGateType {
                node: self.uid,
                gate: GEN.to_string(),
            }),
        }
    }

    /// Reads a parameter value.
    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Removes a parameter value; subsequent reads return `None`.
    pub fn clear_parameter(&mut self, name: &str) {
        self.parameters.remove(name);
    }

    /// A copy of the parameter map.
    pub fn clone_parameters(&self) -> HashMap<String, Value> {
        self.parameters.clone()
    }

    /// Recomputes `is_active` from the current gate outputs.
    pub(crate) fn update_is_active(&mut self) {
        self.is_active = self.gates.values().any(|g| g.activation.abs() > f64::EPSILON);
    }
}

/// Snapshot of a node as exposed to external consumers (change log, clone
/// results, calculation state). Link lists are grouped per gate type; gates
/// without outgoing links are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub uid: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: [f64; 3],
    pub parent_nodespace: NodespaceId,
    pub parameters: HashMap<String, Value>,
    /// Current activation per gate type.
    pub gate_activations: BTreeMap<String, f64>,
    pub is_active: bool,
    /// Outgoing links grouped by source gate type.
    pub links: BTreeMap<String, Vec<LinkData>>,
}

//! The step pipeline: one discrete calculation tick.
//!
//! A tick freezes every slot input and the modulator values first, then runs
//! the installed step-operators in order, then exchanges data with the bound
//! world adapter, and finally advances the step counter and prunes the change
//! log. Because all inputs are frozen up front, node computation order within
//! a tick is unobservable.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::CoreResult;
use crate::nodetype::NodeContext;
use crate::types::NodeId;

use super::Nodenet;

/// Builtin type names the propagation phase must skip; their gates are
/// written by the world-exchange phase instead.
const SENSOR_TYPE: &str = "Sensor";
const ACTUATOR_TYPE: &str = "Actuator";

/// One phase of the per-tick pipeline.
///
/// Operators run in installation order with exclusive access to the nodenet.
/// An operator failure aborts the tick and surfaces to the caller; per-node
/// failures inside the propagation operator do not.
pub trait StepOperator: Send {
    /// Stable operator name, reported for introspection.
    fn name(&self) -> &'static str;

    /// Runs this phase against the nodenet.
    fn execute(&mut self, net: &mut Nodenet) -> CoreResult<()>;
}

/// Runs every node function against the frozen slot inputs and pushes the
/// staged outputs through the gate functions.
///
/// A failing node function is isolated: the failure is logged, the node is
/// marked inactive, its gates keep their previous activations, and the tick
/// continues with the remaining nodes.
#[derive(Debug, Default)]
pub struct PropagationOperator;

impl StepOperator for PropagationOperator {
    fn name(&self) -> &'static str {
        "propagation"
    }

    fn execute(&mut self, net: &mut Nodenet) -> CoreResult<()> {
        let snapshot = net.modulator_snapshot.clone();
        let modulators = net.modulators.is_enabled().then_some(&snapshot);

        let node_ids: Vec<NodeId> = net.nodes.keys().copied().collect();
        for uid in node_ids {
            let Some(node) = net.nodes.get(&uid) else {
                continue;
            };
            let type_name = node.node_type.clone();
            if type_name == SENSOR_TYPE || type_name == ACTUATOR_TYPE {
                continue;
            }
            let Some(nodetype) = net.registry.get(&type_name) else {
                tracing::warn!(node = %uid, nodetype = %type_name, "node has no registered type");
                continue;
            };
            let Some(function) = nodetype.nodefunction.clone() else {
                continue;
            };

            let parameters = node.parameters.clone();
            let declared: BTreeSet<String> = node.gates.keys().cloned().collect();
            let slots = net.frozen_slots.get(&uid).cloned().unwrap_or_default();

            let mut outputs = BTreeMap::new();
            let mut ctx = NodeContext::new(uid, &slots, &mut outputs, &declared, &parameters, modulators);
            match function(&mut ctx) {
                Ok(()) => {
                    if let Some(node) = net.nodes.get_mut(&uid) {
                        for (gate_type, gate) in node.gates.iter_mut() {
                            match outputs.get(gate_type) {
                                Some(raw) => gate.gate_function(*raw),
                                None => gate.decay(),
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(node = %uid, nodetype = %type_name, error = %err, "node function failed");
                    if let Some(node) = net.nodes.get_mut(&uid) {
                        node.is_active = false;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Applies the per-tick homeostatic decay of every modulator toward its
/// baseline. Installed only for nodenets created with modulators enabled.
#[derive(Debug, Default)]
pub struct ModulatorDecayOperator;

impl StepOperator for ModulatorDecayOperator {
    fn name(&self) -> &'static str {
        "modulator_decay"
    }

    fn execute(&mut self, net: &mut Nodenet) -> CoreResult<()> {
        net.modulators.decay_toward_baseline();
        Ok(())
    }
}

/// The default operator pipeline for a new nodenet.
pub(super) fn default_operators(use_modulators: bool) -> Vec<Box<dyn StepOperator>> {
    let mut operators: Vec<Box<dyn StepOperator>> = vec![Box::new(PropagationOperator)];
    if use_modulators {
        operators.push(Box::new(ModulatorDecayOperator));
    }
    operators
}

impl Nodenet {
    /// Runs one calculation tick.
    ///
    /// Pipeline order: freeze slot inputs and modulators, run the installed
    /// operators, exchange sensor/actuator data with the world, recompute
    /// per-node activity flags, advance the step counter, prune the change
    /// log. Pending user prompts never block the tick.
    pub fn step(&mut self) -> CoreResult<()> {
        self.freeze_slot_inputs();
        self.modulator_snapshot = self.modulators.snapshot();

        // The operator list is detached while running so operators can take
        // `&mut self` without aliasing it.
        let mut operators = std::mem::take(&mut self.operators);
        let mut result = Ok(());
        for operator in operators.iter_mut() {
            if let Err(err) = operator.execute(self) {
                tracing::error!(operator = operator.name(), error = %err, "step operator failed");
                result = Err(err);
                break;
            }
        }
        self.operators = operators;
        result?;

        self.exchange_world();

        for node in self.nodes.values_mut() {
            node.update_is_active();
        }
        self.current_step += 1;
        self.changelog.prune(self.current_step);
        tracing::trace!(nodenet = %self.uid(), step = self.current_step, "tick complete");
        Ok(())
    }

    /// Appends an operator phase to the pipeline.
    pub fn install_operator(&mut self, operator: Box<dyn StepOperator>) {
        self.operators.push(operator);
    }

    /// Computes every node's slot inputs from the current gate activations
    /// and link weights, before any gate is rewritten this tick.
    fn freeze_slot_inputs(&mut self) {
        let mut frozen: HashMap<NodeId, BTreeMap<String, f64>> = HashMap::new();
        for node in self.nodes.values() {
            let mut inputs = BTreeMap::new();
            for (slot_type, slot) in &node.slots {
                let mut sum = 0.0;
                for link_id in slot.links() {
                    let Some(link) = self.links.get(link_id) else {
                        continue;
                    };
                    let source_activation = self
                        .nodes
                        .get(&link.source_node)
                        .and_then(|n| n.get_gate(&link.source_gate))
                        .map(|g| g.activation)
                        .unwrap_or(0.0);
                    sum += link.weight * source_activation;
                }
                inputs.insert(slot_type.clone(), sum);
            }
            frozen.insert(node.uid, inputs);
        }

        for node in self.nodes.values_mut() {
            if let Some(inputs) = frozen.get(&node.uid) {
                for (slot_type, slot) in node.slots.iter_mut() {
                    slot.activation = inputs.get(slot_type).copied().unwrap_or(0.0);
                }
            }
        }
        self.frozen_slots = frozen;
    }

    /// The world-exchange phase: actuators write their frozen `gen` input to
    /// the adapter's datatargets, sensors read the adapter's datasources into
    /// their `gen` gates.
    ///
    /// Names unknown to the adapter (or any name when no adapter is bound)
    /// resolve against the modulator store instead: an actuator hard-sets the
    /// modulator of that name, a sensor reads the modulator value as of tick
    /// start.
    fn exchange_world(&mut self) {
        if let Some(world) = self.world.as_deref_mut() {
            world.reset_datatargets();
        }

        let node_ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for uid in node_ids {
            let Some(node) = self.nodes.get(&uid) else {
                continue;
            };
            match node.node_type.as_str() {
                ACTUATOR_TYPE => {
                    let target = node
                        .get_parameter("datatarget")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    let value = self
                        .frozen_slots
                        .get(&uid)
                        .and_then(|slots| slots.get("gen"))
                        .copied()
                        .unwrap_or(0.0);
                    if let Some(target) = target {
                        let written = self
                            .world
                            .as_deref_mut()
                            .map(|w| w.set_datatarget_value(&target, value))
                            .unwrap_or(false);
                        if !written {
                            self.modulators.set(&target, value);
                        }
                    }
                    if let Some(node) = self.nodes.get_mut(&uid) {
                        if let Some(gate) = node.get_gate_mut("gen") {
                            gate.gate_function(value);
                        }
                    }
                }
                SENSOR_TYPE => {
                    let source = node
                        .get_parameter("datasource")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    let value = source
                        .as_deref()
                        .and_then(|name| {
                            self.world
                                .as_deref()
                                .and_then(|w| w.get_datasource_value(name))
                                .or_else(|| self.modulator_snapshot.get(name).copied())
                        })
                        .unwrap_or(0.0);
                    if let Some(node) = self.nodes.get_mut(&uid) {
                        if let Some(gate) = node.get_gate_mut("gen") {
                            gate.gate_function(value);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

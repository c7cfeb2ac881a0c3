//! Node-type definitions and the per-process registry of registered types.
//!
//! A [`Nodetype`] declares the capability set of its instances: slot types,
//! gate types and the parameter schema (names, allowed values, defaults),
//! plus an optional executable node function. The [`NodetypeRegistry`] maps
//! type names to validated definitions; reloading swaps one table entry
//! atomically and never mutates live node instances.

mod builtin;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::types::NodeId;

/// Read view handed to a node function during the propagation phase.
///
/// Slot inputs are frozen at tick start; gate writes are collected raw and
/// pushed through each gate's gate function after the node function returns.
pub struct NodeContext<'a> {
    /// The node being computed.
    pub node: NodeId,
    slots: &'a BTreeMap<String, f64>,
    outputs: &'a mut BTreeMap<String, f64>,
    declared_gates: &'a BTreeSet<String>,
    /// The node's current parameter map.
    pub parameters: &'a HashMap<String, Value>,
    modulators: Option<&'a BTreeMap<String, f64>>,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        node: NodeId,
        slots: &'a BTreeMap<String, f64>,
        outputs: &'a mut BTreeMap<String, f64>,
        declared_gates: &'a BTreeSet<String>,
        parameters: &'a HashMap<String, Value>,
        modulators: Option<&'a BTreeMap<String, f64>>,
    ) -> Self {
        Self {
            node,
            slots,
            outputs,
            declared_gates,
            parameters,
            modulators,
        }
    }

    /// The frozen input of the given slot, `0.0` for undeclared slots.
    pub fn slot(&self, slot_type: &str) -> f64 {
        self.slots.get(slot_type).copied().unwrap_or(0.0)
    }

    /// Declared gate type names of this node.
    pub fn gate_types(&self) -> Vec<String> {
        self.declared_gates.iter().cloned().collect()
    }

    /// Stages an output value for the given gate.
    ///
    /// The value passes through the gate function (threshold, amplification,
    /// clamping) when the node function returns.
    pub fn activate_gate(&mut self, gate_type: &str, value: f64) -> CoreResult<()> {
        if !self.declared_gates.contains(gate_type) {
            return Err(CoreError::UnknownGateType {
                node: self.node,
                gate: gate_type.to_string(),
            });
        }
        self.outputs.insert(gate_type.to_string(), value);
        Ok(())
    }

    /// Reads a parameter value.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Reads a modulator value as of tick start. `None` when modulators are
    /// disabled for the owning nodenet or the name is unknown.
    pub fn modulator(&self, name: &str) -> Option<f64> {
        self.modulators.and_then(|m| m.get(name).copied())
    }
}

/// Executable function of a node type.
///
/// Pure given slot inputs, parameters and modulator reads; failures are
/// isolated per node by the step pipeline and never abort the tick.
pub type NodeFunction = Arc<dyn Fn(&mut NodeContext<'_>) -> CoreResult<()> + Send + Sync>;

/// A registered node type: capability set plus optional node function.
#[derive(Clone)]
pub struct Nodetype {
    /// Display name; also the registry key.
    pub name: String,
    /// Declared slot types, in declaration order.
    pub slottypes: Vec<String>,
    /// Declared gate types, in declaration order.
    pub gatetypes: Vec<String>,
    /// Declared parameter names.
    pub parameters: Vec<String>,
    /// Enumerated legal values per parameter, where declared.
    pub parameter_values: HashMap<String, Vec<Value>>,
    /// Default values per parameter, where declared.
    pub parameter_defaults: HashMap<String, Value>,
    /// The node function, absent for types computed by the engine itself
    /// (Sensor/Actuator world exchange).
    pub nodefunction: Option<NodeFunction>,
}

impl fmt::Debug for Nodetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nodetype")
            .field("name", &self.name)
            .field("slottypes", &self.slottypes)
            .field("gatetypes", &self.gatetypes)
            .field("parameters", &self.parameters)
            .field("has_function", &self.nodefunction.is_some())
            .finish()
    }
}

impl Nodetype {
    /// Creates a node type with the given ports and no parameters.
    pub fn new(
        name: impl Into<String>,
        slottypes: Vec<String>,
        gatetypes: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            slottypes,
            gatetypes,
            parameters: Vec::new(),
            parameter_values: HashMap::new(),
            parameter_defaults: HashMap::new(),
            nodefunction: None,
        }
    }

    /// Declares the parameter-name list.
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Declares enumerated legal values for a parameter.
    pub fn with_parameter_values(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.parameter_values.insert(name.into(), values);
        self
    }

    /// Declares a default value for a parameter.
    pub fn with_parameter_default(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameter_defaults.insert(name.into(), value);
        self
    }

    /// Attaches the node function.
    pub fn with_function(mut self, function: NodeFunction) -> Self {
        self.nodefunction = Some(function);
        self
    }

    /// Validates the definition. Reload is all-or-nothing per type: an
    /// invalid definition is rejected before it can replace a working entry.
    pub fn validate(&self) -> CoreResult<()> {
        let fail = |message: String| {
            Err(CoreError::Load {
                name: self.name.clone(),
                message,
            })
        };
        if self.name.trim().is_empty() {
            return fail("empty type name".into());
        }
        for key in self.parameter_defaults.keys() {
            if !self.parameters.contains(key) {
                return fail(format!("default for undeclared parameter '{key}'"));
            }
        }
        for (key, values) in &self.parameter_values {
            if !self.parameters.contains(key) {
                return fail(format!("value enumeration for undeclared parameter '{key}'"));
            }
            if let Some(default) = self.parameter_defaults.get(key) {
                if !values.contains(default) {
                    return fail(format!(
                        "default for parameter '{key}' is outside its enumeration"
                    ));
                }
            }
        }
        Ok(())
    }

    /// The declared defaults, keyed by parameter name.
    pub fn default_parameters(&self) -> HashMap<String, Value> {
        self.parameter_defaults.clone()
    }

    /// Checks a value against the parameter's enumeration, where declared.
    pub fn check_parameter_value(&self, name: &str, value: &Value) -> CoreResult<()> {
        if let Some(allowed) = self.parameter_values.get(name) {
            if !allowed.contains(value) {
                return Err(CoreError::Validation {
                    field: name.to_string(),
                    message: format!("value {value} is not among the declared values"),
                });
            }
        }
        Ok(())
    }

    /// Merges caller-supplied parameters over the declared defaults.
    ///
    /// An empty-string value counts as unspecified and falls back to the
    /// declared default (or stays unset). Supplied values are checked
    /// against declared enumerations.
    pub fn initial_parameters(
        &self,
        supplied: &HashMap<String, Value>,
    ) -> CoreResult<HashMap<String, Value>> {
        let mut parameters = self.default_parameters();
        for (name, value) in supplied {
            if value.as_str().is_some_and(|s| s.is_empty()) {
                continue;
            }
            self.check_parameter_value(name, value)?;
            parameters.insert(name.clone(), value.clone());
        }
        Ok(parameters)
    }
}

/// Process-wide table of registered node types.
///
/// Shared by every nodenet of a runtime; lookups hand out `Arc<Nodetype>`
/// so a reload never mutates a type a running step already resolved.
#[derive(Debug, Default)]
pub struct NodetypeRegistry {
    inner: RwLock<HashMap<String, Arc<Nodetype>>>,
}

impl NodetypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the builtin types
    /// (Register, Sensor, Actuator, Pipe).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::install(&registry);
        registry
    }

    /// Resolves a type by name.
    pub fn get(&self, name: &str) -> Option<Arc<Nodetype>> {
        self.inner.read().get(name).cloned()
    }

    /// True if a type of this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Validates and installs one type, atomically replacing any previous
    /// entry of the same name. The previous entry survives a failed
    /// validation untouched.
    pub fn register(&self, nodetype: Nodetype) -> CoreResult<()> {
        nodetype.validate()?;
        let name = nodetype.name.clone();
        self.inner.write().insert(name.clone(), Arc::new(nodetype));
        tracing::debug!(nodetype = %name, "registered node type");
        Ok(())
    }

    /// Re-registers a batch of type definitions.
    ///
    /// Each type is all-or-nothing: valid definitions are installed, invalid
    /// ones are rejected without unloading whatever was registered before.
    /// Returns the number of installed types, or the aggregated failures.
    pub fn reload(&self, nodetypes: Vec<Nodetype>) -> CoreResult<usize> {
        let mut installed = 0;
        let mut failures = Vec::new();
        for nodetype in nodetypes {
            let name = nodetype.name.clone();
            match self.register(nodetype) {
                Ok(()) => installed += 1,
                Err(err) => {
                    tracing::error!(nodetype = %name, error = %err, "node type reload failed");
                    failures.push(format!("{name}: {err}"));
                }
            }
        }
        if failures.is_empty() {
            Ok(installed)
        } else {
            Err(CoreError::Load {
                name: "reload".into(),
                message: failures.join("; "),
            })
        }
    }
}

#[cfg(test)]
mod tests_registry;

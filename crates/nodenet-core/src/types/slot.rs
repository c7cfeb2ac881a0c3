//! Slot: a typed input port of a node.

use serde::{Deserialize, Serialize};

use super::link::LinkId;

/// A typed input port of a node.
///
/// The slot's activation is the weighted sum of source-gate activations,
/// computed once per tick before any gate function runs. Inputs are frozen
/// at tick start, so no node function can observe another node's output from
/// the same tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot type name ("gen", "sub", ...).
    pub slot_type: String,
    /// Aggregated input as of the start of the current tick.
    pub activation: f64,
    pub(crate) incoming: Vec<LinkId>,
}

impl Slot {
    /// Creates an inactive slot of the given type.
    pub fn new(slot_type: impl Into<String>) -> Self {
        Self {
            slot_type: slot_type.into(),
            activation: 0.0,
            incoming: Vec::new(),
        }
    }

    /// Ordered incoming links of this slot.
    pub fn links(&self) -> &[LinkId] {
        &self.incoming
    }
}

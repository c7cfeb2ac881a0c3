//! Gate: a typed output port of a node.

use serde::{Deserialize, Serialize};

use super::link::LinkId;

/// Per-gate parameter set shaping the gate function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateParameters {
    /// Inputs below this value produce zero output.
    pub threshold: f64,
    /// Multiplier applied to above-threshold inputs.
    pub amplification: f64,
    /// Lower clamp for the gate output.
    pub minimum: f64,
    /// Upper clamp for the gate output.
    pub maximum: f64,
    /// Per-tick shrink factor applied when the gate receives no new output.
    /// `0.0` keeps the previous activation, `1.0` clears it in one tick.
    pub decay: f64,
}

impl Default for GateParameters {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            amplification: 1.0,
            minimum: -1.0,
            maximum: 1.0,
            decay: 0.0,
        }
    }
}

impl GateParameters {
    /// The gate function: pure given input and parameters.
    ///
    /// Sub-threshold inputs yield `0.0`; everything else is amplified and
    /// clamped to `[minimum, maximum]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nodenet_core::types::GateParameters;
    ///
    /// let params = GateParameters::default();
    /// assert_eq!(params.apply(0.63), 0.63);
    /// assert_eq!(params.apply(2.5), 1.0);
    /// assert_eq!(params.apply(-0.1), 0.0);
    /// ```
    pub fn apply(&self, input: f64) -> f64 {
        if input < self.threshold {
            0.0
        } else {
            (input * self.amplification).clamp(self.minimum, self.maximum)
        }
    }
}

/// A typed output port of a node, holding the current output activation and
/// the ordered set of outgoing links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Gate type name ("gen", "sub", "sur", ...).
    pub gate_type: String,
    /// Parameters shaping the gate function.
    pub parameters: GateParameters,
    /// Current output activation.
    pub activation: f64,
    pub(crate) outgoing: Vec<LinkId>,
}

impl Gate {
    /// Creates an inactive gate of the given type with default parameters.
    pub fn new(gate_type: impl Into<String>) -> Self {
        Self {
            gate_type: gate_type.into(),
            parameters: GateParameters::default(),
            activation: 0.0,
            outgoing: Vec::new(),
        }
    }

    /// Runs the gate function on `input` and stores the result as the gate's
    /// output activation.
    pub fn gate_function(&mut self, input: f64) {
        self.activation = self.parameters.apply(input);
    }

    /// Applies per-tick decay for a tick in which no node function wrote
    /// this gate.
    pub(crate) fn decay(&mut self) {
        if self.parameters.decay > 0.0 {
            self.activation *= 1.0 - self.parameters.decay.clamp(0.0, 1.0);
        }
    }

    /// Ordered outgoing links of this gate.
    pub fn links(&self) -> &[LinkId] {
        &self.outgoing
    }
}

//! Modulators: named global scalar state with a smoothed update rule.
//!
//! Each nodenet owns one [`ModulatorStore`]; there is no process-wide
//! modulator state. [`ModulatorStore::change`] applies an exponential
//! approach toward the target value instead of an additive increment;
//! [`ModulatorStore::set`] is a hard overwrite used for initialization and
//! for actuators writing modulator pseudo-datatargets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Smoothing factor `K` of the modulator update rule
/// `new = old + K * (delta - old)`.
///
/// Calibrated against the one observable data point of the emotional-
/// parameter model: a delta of `0.42` applied to a value of `-1.0` yields
/// `~-0.58`. The exact source constant is not derivable from behavior, so
/// the calibrated value is exposed here as a configurable constant.
pub const MODULATOR_SMOOTHING: f64 = 0.2958;

/// Baseline every `emo_*` modulator decays toward.
pub const EMO_BASELINE: f64 = 0.5;

/// Per-tick homeostatic decay rate toward baseline.
pub const EMO_DECAY_RATE: f64 = 0.05;

/// Modulators installed on every nodenet created with modulators enabled,
/// with their baseline values.
pub const DEFAULT_MODULATORS: &[(&str, f64)] = &[
    ("emo_activation", EMO_BASELINE),
    ("emo_pleasure", EMO_BASELINE),
    ("emo_securing_rate", EMO_BASELINE),
    ("emo_resolution", EMO_BASELINE),
    ("emo_selection_threshold", EMO_BASELINE),
    ("emo_sustaining_joint", EMO_BASELINE),
    ("base_importance_of_intention", 0.0),
    ("base_urge_change", 0.0),
    ("base_age", 0.0),
    ("base_unexpectedness", 0.0),
];

/// Named scalar state owned by one nodenet.
///
/// A disabled store stays empty: reads return `None` and writes are ignored,
/// mirroring a nodenet created with modulators turned off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulatorStore {
    enabled: bool,
    values: BTreeMap<String, f64>,
    baselines: BTreeMap<String, f64>,
}

impl ModulatorStore {
    /// An enabled store seeded with [`DEFAULT_MODULATORS`].
    ///
    /// Only the `emo_*` modulators register a baseline; `base_*` values hold
    /// whatever was last written to them.
    pub fn with_defaults() -> Self {
        let values: BTreeMap<String, f64> = DEFAULT_MODULATORS
            .iter()
            .map(|(name, baseline)| (name.to_string(), *baseline))
            .collect();
        let baselines = values
            .iter()
            .filter(|(name, _)| name.starts_with("emo_"))
            .map(|(name, baseline)| (name.clone(), *baseline))
            .collect();
        Self {
            enabled: true,
            baselines,
            values,
        }
    }

    /// A disabled, permanently empty store.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            values: BTreeMap::new(),
            baselines: BTreeMap::new(),
        }
    }

    /// Whether this store accepts modulator state at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when no modulator is present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a modulator value.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Hard-overwrites a modulator value, creating it if necessary.
    pub fn set(&mut self, name: &str, value: f64) {
        if !self.enabled {
            tracing::debug!(modulator = name, "ignoring write to disabled modulator store");
            return;
        }
        self.values.insert(name.to_string(), value);
    }

    /// Applies the smoothed update rule: the value moves a
    /// [`MODULATOR_SMOOTHING`] fraction of the remaining gap toward `delta`.
    /// Unknown names start from `0.0`.
    pub fn change(&mut self, name: &str, delta: f64) {
        if !self.enabled {
            tracing::debug!(modulator = name, "ignoring change on disabled modulator store");
            return;
        }
        let old = self.values.get(name).copied().unwrap_or(0.0);
        let new = old + MODULATOR_SMOOTHING * (delta - old);
        self.values.insert(name.to_string(), new);
        tracing::debug!(modulator = name, old, new, "modulator changed");
    }

    /// One homeostatic tick: every modulator with a registered baseline (the
    /// `emo_*` set) decays toward it by [`EMO_DECAY_RATE`].
    pub fn decay_toward_baseline(&mut self) {
        if !self.enabled {
            return;
        }
        for (name, baseline) in &self.baselines {
            if let Some(value) = self.values.get_mut(name) {
                *value += EMO_DECAY_RATE * (baseline - *value);
            }
        }
    }

    /// Snapshot of all values, used to freeze modulator reads at tick start.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.values.clone()
    }

    /// Iterates over all (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

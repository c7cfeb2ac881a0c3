//! WorldAdapter: the data-exchange boundary toward an external world.
//!
//! A bound adapter exposes named datasources (read by Sensor nodes) and
//! datatargets (written by Actuator nodes). The exchange is synchronous and
//! bounded; `reset_datatargets` runs once per tick before any actuator
//! write. Modulator pseudo-channels (a sensor reading `emo_activation`, an
//! actuator writing `base_importance_of_intention`) are resolved by the step
//! pipeline, not by the adapter.

use std::collections::BTreeMap;

/// Per-nodenet boundary object mapping Sensor/Actuator nodes to named
/// external data channels.
pub trait WorldAdapter: Send {
    /// Names of the readable channels.
    fn datasources(&self) -> Vec<String>;

    /// Names of the writable channels.
    fn datatargets(&self) -> Vec<String>;

    /// Reads a datasource value; `None` for unknown names.
    fn get_datasource_value(&self, name: &str) -> Option<f64>;

    /// Reads back a datatarget value; `None` for unknown names.
    fn get_datatarget_value(&self, name: &str) -> Option<f64>;

    /// Writes a datatarget value. Returns `false` for unknown names so the
    /// pipeline can fall back to modulator pseudo-channels.
    fn set_datatarget_value(&mut self, name: &str, value: f64) -> bool;

    /// Clears all datatargets; invoked once per tick before actuator writes.
    fn reset_datatargets(&mut self);
}

/// Buffer-backed adapter with a fixed channel layout.
///
/// Serves as the default binding for nodenets without a real world and as
/// the test double for the sensor/actuator exchange contract.
#[derive(Debug, Clone, Default)]
pub struct BufferWorldAdapter {
    sources: BTreeMap<String, f64>,
    targets: BTreeMap<String, f64>,
}

impl BufferWorldAdapter {
    /// An adapter without any channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter with the given named channels, all starting at `0.0`.
    pub fn with_channels(sources: &[&str], targets: &[&str]) -> Self {
        Self {
            sources: sources.iter().map(|s| (s.to_string(), 0.0)).collect(),
            targets: targets.iter().map(|t| (t.to_string(), 0.0)).collect(),
        }
    }

    /// Sets a datasource value from the world side.
    pub fn set_datasource_value(&mut self, name: &str, value: f64) {
        self.sources.insert(name.to_string(), value);
    }
}

impl WorldAdapter for BufferWorldAdapter {
    fn datasources(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    fn datatargets(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    fn get_datasource_value(&self, name: &str) -> Option<f64> {
        self.sources.get(name).copied()
    }

    fn get_datatarget_value(&self, name: &str) -> Option<f64> {
        self.targets.get(name).copied()
    }

    fn set_datatarget_value(&mut self, name: &str, value: f64) -> bool {
        match self.targets.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn reset_datatargets(&mut self) {
        for value in self.targets.values_mut() {
            *value = 0.0;
        }
    }
}

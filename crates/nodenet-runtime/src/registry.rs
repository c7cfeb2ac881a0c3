//! The process-wide nodenet registry.
//!
//! Owns every loaded [`Nodenet`] behind its own mutex, the shared nodetype
//! registry and the table of named world-adapter factories. Distinct
//! nodenets never share mutable state, so operations on different nodenets
//! proceed independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nodenet_core::changelog::{ActivationData, NodespaceChanges};
use nodenet_core::types::{NodeData, NodeId, NodenetId, NodespaceId};
use nodenet_core::world::{BufferWorldAdapter, WorldAdapter};
use nodenet_core::{
    CoreError, EntityKind, LinkScope, Nodenet, NodenetConfig, Nodetype, NodetypeRegistry,
    PromptOption,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::persistence;

/// Constructor for a named world-adapter binding.
pub type WorldAdapterFactory = Box<dyn Fn() -> Box<dyn WorldAdapter> + Send + Sync>;

/// Adapter name that always resolves, yielding a channel-less buffer.
pub const DEFAULT_WORLDADAPTER: &str = "Default";

/// Listing entry for one loaded nodenet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodenetSummary {
    pub uid: NodenetId,
    pub name: String,
    pub owner: String,
    pub current_step: u64,
    pub worldadapter: Option<String>,
}

/// Pending user prompt as reported in the calculation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptState {
    pub msg: String,
    /// Snapshot of the node that raised the prompt.
    pub node: NodeData,
    pub options: Vec<PromptOption>,
}

/// Poll result for external frontends: step counter, activity flag and any
/// pending prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationState {
    pub current_step: u64,
    pub is_active: bool,
    pub user_prompt: Option<PromptState>,
}

/// Process-wide registry of nodenets, nodetypes and world adapters.
pub struct Runtime {
    data_dir: PathBuf,
    nodetypes: Arc<NodetypeRegistry>,
    nodenets: RwLock<HashMap<NodenetId, Arc<Mutex<Nodenet>>>>,
    worldadapters: RwLock<HashMap<String, WorldAdapterFactory>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("data_dir", &self.data_dir)
            .field("nodenets", &self.nodenets.read().len())
            .finish()
    }
}

impl Runtime {
    /// Starts a runtime over a data directory, loading every persisted
    /// nodenet found there.
    pub fn new(data_dir: impl Into<PathBuf>) -> RuntimeResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let nodetypes = Arc::new(NodetypeRegistry::with_builtins());

        let mut nodenets = HashMap::new();
        for state in persistence::load_all(&data_dir)? {
            let uid = state.uid;
            let net = Nodenet::restore(state, nodetypes.clone());
            nodenets.insert(uid, Arc::new(Mutex::new(net)));
        }
        tracing::info!(
            path = %data_dir.display(),
            loaded = nodenets.len(),
            "runtime started"
        );

        let runtime = Self {
            data_dir,
            nodetypes,
            nodenets: RwLock::new(nodenets),
            worldadapters: RwLock::new(HashMap::new()),
        };
        runtime.register_worldadapter(DEFAULT_WORLDADAPTER, Box::new(|| {
            Box::new(BufferWorldAdapter::new())
        }));
        Ok(runtime)
    }

    /// The shared nodetype registry.
    pub fn nodetypes(&self) -> &Arc<NodetypeRegistry> {
        &self.nodetypes
    }

    /// The runtime's data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ---------------------------------------------------------------------
    // Nodenet lifecycle
    // ---------------------------------------------------------------------

    /// Creates a nodenet and persists it immediately.
    pub fn new_nodenet(
        &self,
        name: &str,
        owner: &str,
        config: NodenetConfig,
    ) -> RuntimeResult<NodenetId> {
        let net = Nodenet::new(name, owner, self.nodetypes.clone(), config);
        let uid = net.uid();
        persistence::save(&self.data_dir, &net.snapshot())?;
        self.nodenets.write().insert(uid, Arc::new(Mutex::new(net)));
        tracing::info!(nodenet = %uid, name, "created nodenet");
        Ok(uid)
    }

    /// Unloads a nodenet and removes its persisted file. Fails when the
    /// nodenet is mid-operation.
    pub fn delete_nodenet(&self, uid: NodenetId) -> RuntimeResult<()> {
        let handle = self.handle(uid)?;
        // The guard is held until the nodenet is gone from both the map and
        // the disk, so no step can start against it mid-deletion. Accessors
        // release the map lock before locking the nodenet mutex, so taking
        // the map write lock under the guard cannot deadlock.
        let _guard = handle
            .try_lock()
            .ok_or(RuntimeError::Core(CoreError::InUse { id: uid }))?;
        self.nodenets.write().remove(&uid);
        persistence::delete(&self.data_dir, uid)?;
        tracing::info!(nodenet = %uid, "deleted nodenet");
        Ok(())
    }

    /// Lists loaded nodenets, optionally restricted to one owner.
    pub fn get_available_nodenets(&self, owner: Option<&str>) -> Vec<NodenetSummary> {
        let nodenets = self.nodenets.read();
        let mut listing: Vec<NodenetSummary> = nodenets
            .values()
            .map(|handle| {
                let net = handle.lock();
                NodenetSummary {
                    uid: net.uid(),
                    name: net.name().to_string(),
                    owner: net.owner().to_string(),
                    current_step: net.current_step(),
                    worldadapter: net.worldadapter_name().map(str::to_string),
                }
            })
            .filter(|summary| owner.map_or(true, |o| summary.owner == o))
            .collect();
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        listing
    }

    fn handle(&self, uid: NodenetId) -> RuntimeResult<Arc<Mutex<Nodenet>>> {
        self.nodenets
            .read()
            .get(&uid)
            .cloned()
            .ok_or(RuntimeError::Core(CoreError::NotFound {
                kind: EntityKind::Nodenet,
                id: uid,
            }))
    }

    /// Runs a closure with exclusive access to one nodenet.
    pub fn with_nodenet<R>(
        &self,
        uid: NodenetId,
        f: impl FnOnce(&mut Nodenet) -> Result<R, CoreError>,
    ) -> RuntimeResult<R> {
        let handle = self.handle(uid)?;
        let mut net = handle.lock();
        Ok(f(&mut net)?)
    }

    // ---------------------------------------------------------------------
    // Calculation
    // ---------------------------------------------------------------------

    /// Runs one tick and returns the new step counter.
    pub fn step_nodenet(&self, uid: NodenetId) -> RuntimeResult<u64> {
        self.with_nodenet(uid, |net| {
            net.step()?;
            Ok(net.current_step())
        })
    }

    /// Marks a nodenet running or paused.
    pub fn set_nodenet_active(&self, uid: NodenetId, active: bool) -> RuntimeResult<()> {
        self.with_nodenet(uid, |net| {
            net.set_active(active);
            Ok(())
        })
    }

    /// The poll state frontends fetch between ticks.
    pub fn get_calculation_state(&self, uid: NodenetId) -> RuntimeResult<CalculationState> {
        self.with_nodenet(uid, |net| {
            let user_prompt = match net.user_prompt() {
                Some(prompt) => Some(PromptState {
                    msg: prompt.msg.clone(),
                    options: prompt.options.clone(),
                    node: net.get_node_data(prompt.node)?,
                }),
                None => None,
            };
            Ok(CalculationState {
                current_step: net.current_step(),
                is_active: net.is_active(),
                user_prompt,
            })
        })
    }

    /// Delivers a user-prompt response to a nodenet.
    pub fn user_prompt_response(
        &self,
        uid: NodenetId,
        node: NodeId,
        values: &HashMap<String, Value>,
        resume: bool,
    ) -> RuntimeResult<()> {
        self.with_nodenet(uid, |net| net.user_prompt_response(node, values, resume))
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Creates a node in a nodenet.
    pub fn add_node(
        &self,
        uid: NodenetId,
        type_name: &str,
        nodespace: Option<NodespaceId>,
        position: Option<[f64; 3]>,
        name: Option<&str>,
        parameters: &HashMap<String, Value>,
    ) -> RuntimeResult<NodeId> {
        self.with_nodenet(uid, |net| {
            net.create_node_detailed(type_name, nodespace, name, position, parameters)
        })
    }

    /// Creates a nodespace in a nodenet.
    pub fn add_nodespace(
        &self,
        uid: NodenetId,
        parent: Option<NodespaceId>,
        name: &str,
    ) -> RuntimeResult<NodespaceId> {
        self.with_nodenet(uid, |net| net.create_nodespace(parent, name))
    }

    /// Creates or overwrites a link in a nodenet.
    pub fn add_link(
        &self,
        uid: NodenetId,
        source_node: NodeId,
        gate_type: &str,
        target_node: NodeId,
        slot_type: &str,
        weight: f64,
    ) -> RuntimeResult<()> {
        self.with_nodenet(uid, |net| {
            net.link(source_node, gate_type, target_node, slot_type, weight, 1.0)?;
            Ok(())
        })
    }

    /// Clones nodes within a nodenet; see [`Nodenet::clone_nodes`].
    pub fn clone_nodes(
        &self,
        uid: NodenetId,
        nodes: &[NodeId],
        scope: LinkScope,
        nodespace: Option<NodespaceId>,
        offset: [f64; 3],
    ) -> RuntimeResult<HashMap<NodeId, NodeData>> {
        self.with_nodenet(uid, |net| net.clone_nodes(nodes, scope, nodespace, offset))
    }

    // ---------------------------------------------------------------------
    // Incremental views
    // ---------------------------------------------------------------------

    /// The structural delta of the queried nodespaces since `from_step`.
    pub fn get_nodespace_changes(
        &self,
        uid: NodenetId,
        nodespaces: &[Option<NodespaceId>],
        from_step: u64,
    ) -> RuntimeResult<NodespaceChanges> {
        self.with_nodenet(uid, |net| net.get_nodespace_changes(nodespaces, from_step))
    }

    /// Activation snapshot of the queried nodespaces.
    pub fn get_nodenet_activation_data(
        &self,
        uid: NodenetId,
        nodespaces: &[Option<NodespaceId>],
        from_step: u64,
    ) -> RuntimeResult<ActivationData> {
        self.with_nodenet(uid, |net| net.get_activation_data(nodespaces, from_step))
    }

    /// Replaces the UI property map of one nodespace.
    pub fn set_nodespace_properties(
        &self,
        uid: NodenetId,
        nodespace: Option<NodespaceId>,
        properties: HashMap<String, Value>,
    ) -> RuntimeResult<()> {
        self.with_nodenet(uid, |net| net.set_nodespace_properties(nodespace, properties))
    }

    /// Reads the UI property map of one nodespace.
    pub fn get_nodespace_properties(
        &self,
        uid: NodenetId,
        nodespace: Option<NodespaceId>,
    ) -> RuntimeResult<HashMap<String, Value>> {
        self.with_nodenet(uid, |net| net.get_nodespace_properties(nodespace))
    }

    // ---------------------------------------------------------------------
    // World adapters
    // ---------------------------------------------------------------------

    /// Registers a named world-adapter factory.
    pub fn register_worldadapter(&self, name: impl Into<String>, factory: WorldAdapterFactory) {
        self.worldadapters.write().insert(name.into(), factory);
    }

    fn make_worldadapter(&self, name: &str) -> RuntimeResult<Box<dyn WorldAdapter>> {
        let adapters = self.worldadapters.read();
        match adapters.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(RuntimeError::Core(CoreError::Validation {
                field: "worldadapter".into(),
                message: format!("no world adapter registered under '{name}'"),
            })),
        }
    }

    /// Renames a nodenet and/or rebinds its world adapter.
    ///
    /// Passing `Some("")` as the adapter name drops the current binding.
    pub fn set_nodenet_properties(
        &self,
        uid: NodenetId,
        name: Option<&str>,
        worldadapter: Option<&str>,
    ) -> RuntimeResult<()> {
        let adapter = match worldadapter {
            Some("") | None => None,
            Some(adapter_name) => Some((adapter_name, self.make_worldadapter(adapter_name)?)),
        };
        self.with_nodenet(uid, |net| {
            if let Some(name) = name {
                net.set_name(name);
            }
            match (worldadapter, adapter) {
                (Some(""), _) => net.unbind_world(),
                (_, Some((adapter_name, adapter))) => net.bind_world(adapter_name, adapter),
                _ => {}
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Persists a nodenet's current state.
    pub fn save_nodenet(&self, uid: NodenetId) -> RuntimeResult<()> {
        let handle = self.handle(uid)?;
        let state = handle.lock().snapshot();
        persistence::save(&self.data_dir, &state)
    }

    /// Discards in-memory state and reloads the last saved snapshot,
    /// re-binding the world adapter recorded there.
    pub fn revert_nodenet(&self, uid: NodenetId) -> RuntimeResult<()> {
        let state = persistence::load(&self.data_dir, uid)?;
        let adapter = match state.worldadapter_name.as_deref() {
            Some(name) => Some((name.to_string(), self.make_worldadapter(name)?)),
            None => None,
        };
        let mut net = Nodenet::restore(state, self.nodetypes.clone());
        if let Some((name, adapter)) = adapter {
            net.bind_world(name, adapter);
        }
        let handle = self.handle(uid)?;
        *handle.lock() = net;
        tracing::info!(nodenet = %uid, "reverted nodenet");
        Ok(())
    }

    /// Re-registers native node-type definitions.
    ///
    /// Existing node instances are untouched; they resolve the new
    /// definitions on their next tick. Failed definitions never unload
    /// working ones.
    pub fn reload_native_modules(&self, nodetypes: Vec<Nodetype>) -> RuntimeResult<usize> {
        Ok(self.nodetypes.reload(nodetypes)?)
    }
}

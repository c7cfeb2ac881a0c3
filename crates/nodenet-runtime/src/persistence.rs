//! JSON-file persistence of nodenet state.
//!
//! Each nodenet lives in one file, `<data_dir>/nodenets/<uid>.json`. Saving
//! is explicit; stepping never writes to disk.

use std::fs;
use std::path::{Path, PathBuf};

use nodenet_core::types::NodenetId;
use nodenet_core::NodenetState;

use crate::error::{RuntimeError, RuntimeResult};

/// Subdirectory of the data directory holding nodenet files.
pub const NODENET_DIRECTORY: &str = "nodenets";

fn nodenet_file(data_dir: &Path, uid: NodenetId) -> PathBuf {
    data_dir.join(NODENET_DIRECTORY).join(format!("{uid}.json"))
}

/// Writes a nodenet snapshot, creating the directory on first use.
pub fn save(data_dir: &Path, state: &NodenetState) -> RuntimeResult<()> {
    let path = nodenet_file(data_dir, state.uid);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(&path, json)?;
    tracing::debug!(nodenet = %state.uid, path = %path.display(), "saved nodenet");
    Ok(())
}

/// Reads a nodenet snapshot back.
pub fn load(data_dir: &Path, uid: NodenetId) -> RuntimeResult<NodenetState> {
    let path = nodenet_file(data_dir, uid);
    let json = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Removes a persisted nodenet file; absent files are fine.
pub fn delete(data_dir: &Path, uid: NodenetId) -> RuntimeResult<()> {
    let path = nodenet_file(data_dir, uid);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Loads every persisted nodenet in the data directory.
///
/// Unreadable files are logged and skipped so one corrupt nodenet cannot
/// keep the whole runtime from starting.
pub fn load_all(data_dir: &Path) -> RuntimeResult<Vec<NodenetState>> {
    let dir = data_dir.join(NODENET_DIRECTORY);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut states = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match fs::read_to_string(&path).map_err(RuntimeError::from).and_then(|json| {
            serde_json::from_str::<NodenetState>(&json).map_err(RuntimeError::from)
        }) {
            Ok(state) => states.push(state),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "skipping unreadable nodenet file");
            }
        }
    }
    Ok(states)
}

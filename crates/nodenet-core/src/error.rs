//! Error types for nodenet-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the engine, along with the [`CoreResult<T>`] type alias. The variants map
//! one-to-one onto the engine's failure taxonomy: unknown ids, unknown node
//! or port types, parameter/structure validation, structural mutation racing
//! a step, and node-type load failures.

use thiserror::Error;
use uuid::Uuid;

/// The kind of entity an id failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Nodespace,
    Link,
    Nodenet,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Nodespace => write!(f, "nodespace"),
            EntityKind::Link => write!(f, "link"),
            EntityKind::Nodenet => write!(f, "nodenet"),
        }
    }
}

/// Top-level error type for nodenet-core operations.
///
/// Unknown-id errors are never silently swallowed; the sole exception is
/// [`Nodenet::unlink`](crate::nodenet::Nodenet::unlink), which treats a
/// missing link (but not a missing node) as a no-op.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced node, nodespace, link or nodenet id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What the id was expected to resolve to.
        kind: EntityKind,
        /// The unresolved id.
        id: Uuid,
    },

    /// A node was requested with a type name no registered nodetype carries.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A link creation referenced a gate type the source node does not declare.
    #[error("node {node} declares no gate of type '{gate}'")]
    UnknownGateType {
        /// The offending source node.
        node: Uuid,
        /// The undeclared gate type name.
        gate: String,
    },

    /// A link creation referenced a slot type the target node does not declare.
    #[error("node {node} declares no slot of type '{slot}'")]
    UnknownSlotType {
        /// The offending target node.
        node: Uuid,
        /// The undeclared slot type name.
        slot: String,
    },

    /// A value failed validation: parameter outside its declared enumeration,
    /// deleting the root nodespace, cyclic nodespace reparenting, and similar.
    #[error("validation error: {field} - {message}")]
    Validation {
        /// Name of the field or operation that failed validation.
        field: String,
        /// Description of the validation failure.
        message: String,
    },

    /// A structural mutation raced an in-progress step, or a nodenet was
    /// deleted mid-step.
    #[error("nodenet {id} is in use")]
    InUse {
        /// The busy nodenet.
        id: Uuid,
    },

    /// A native node-type definition failed to (re)load. Previously working
    /// registrations are left untouched.
    #[error("failed to load node type '{name}': {message}")]
    Load {
        /// The node type that failed to load.
        name: String,
        /// What was wrong with the definition.
        message: String,
    },

    /// Error during serialization or deserialization of engine state.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] with node kind.
    pub fn node_not_found(id: Uuid) -> Self {
        CoreError::NotFound {
            kind: EntityKind::Node,
            id,
        }
    }

    /// Shorthand for a [`CoreError::NotFound`] with nodespace kind.
    pub fn nodespace_not_found(id: Uuid) -> Self {
        CoreError::NotFound {
            kind: EntityKind::Nodespace,
            id,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

//! Core graph primitives: nodes, gates, slots, links and nodespaces.

mod gate;
mod link;
mod node;
mod nodespace;
mod slot;

use uuid::Uuid;

pub use gate::{Gate, GateParameters};
pub use link::{Link, LinkData, LinkId, Relation};
pub use node::{Node, NodeData};
pub use nodespace::{Nodespace, NodespaceData};
pub use slot::Slot;

/// Type alias for node identifiers (UUID v4).
pub type NodeId = Uuid;

/// Type alias for nodespace identifiers (UUID v4).
///
/// API surfaces accept `Option<NodespaceId>`, where `None` addresses the
/// nodenet's root nodespace.
pub type NodespaceId = Uuid;

/// Type alias for nodenet identifiers (UUID v4).
pub type NodenetId = Uuid;

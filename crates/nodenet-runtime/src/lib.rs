//! Runtime layer over the nodenet engine.
//!
//! Hosts many independent [`nodenet_core::Nodenet`]s behind one [`Runtime`]:
//! lifecycle (create, delete, list), stepping, the calculation-state poll
//! surface, world-adapter registration and JSON-file persistence under a
//! data directory.

pub mod error;
pub mod persistence;
pub mod registry;

pub use error::{RuntimeError, RuntimeResult};
pub use registry::{
    CalculationState, NodenetSummary, PromptState, Runtime, WorldAdapterFactory,
    DEFAULT_WORLDADAPTER,
};

//! Core engine of a stepped graph-computation system.
//!
//! A [`Nodenet`] is an isolated graph of typed [`types::Node`]s whose gates
//! (outputs) connect to slots (inputs) through weighted [`types::Link`]s,
//! organized in a tree of [`types::Nodespace`]s. Computation advances in
//! discrete ticks: slot inputs are frozen, node functions run, gates fire,
//! sensors and actuators exchange data with a bound [`world::WorldAdapter`],
//! and the step counter advances.
//!
//! Node behavior is defined by [`Nodetype`]s held in a shared
//! [`NodetypeRegistry`]; global scalar state lives in the per-nodenet
//! [`modulators::ModulatorStore`]; incremental consumers follow mutations
//! through the bounded [`changelog::ChangeLog`].

pub mod changelog;
pub mod error;
pub mod modulators;
pub mod nodenet;
pub mod nodetype;
pub mod types;
pub mod world;

pub use error::{CoreError, CoreResult, EntityKind};
pub use nodenet::{
    LinkScope, ModulatorDecayOperator, Nodenet, NodenetConfig, NodenetData, NodenetState,
    PromptOption, PropagationOperator, StepOperator, UserPrompt,
};
pub use nodetype::{NodeContext, NodeFunction, Nodetype, NodetypeRegistry};

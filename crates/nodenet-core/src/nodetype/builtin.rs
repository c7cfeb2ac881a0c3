//! Builtin node types.

use std::sync::Arc;

use super::{NodeContext, Nodetype, NodetypeRegistry};
use crate::error::CoreResult;

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Register: forwards its `gen` slot input through the `gen` gate.
fn register_function(ctx: &mut NodeContext<'_>) -> CoreResult<()> {
    let input = ctx.slot("gen");
    ctx.activate_gate("gen", input)
}

/// Pipe: forwards each slot input through the gate of the same type.
fn pipe_function(ctx: &mut NodeContext<'_>) -> CoreResult<()> {
    for gate_type in ctx.gate_types() {
        let input = ctx.slot(&gate_type);
        ctx.activate_gate(&gate_type, input)?;
    }
    Ok(())
}

/// Installs the builtin types into a registry.
///
/// Sensor and Actuator carry no node function; the step pipeline computes
/// them during the world-exchange phase against the bound adapter's named
/// datasources/datatargets (and modulator pseudo-channels).
pub(super) fn install(registry: &NodetypeRegistry) {
    let pipe_ports = strings(&["gen", "por", "ret", "sub", "sur", "cat", "exp"]);

    let builtins = vec![
        Nodetype::new("Register", strings(&["gen"]), strings(&["gen"]))
            .with_function(Arc::new(register_function)),
        Nodetype::new("Sensor", strings(&["gen"]), strings(&["gen"]))
            .with_parameters(strings(&["datasource"])),
        Nodetype::new("Actuator", strings(&["gen"]), strings(&["gen"]))
            .with_parameters(strings(&["datatarget"])),
        Nodetype::new("Pipe", pipe_ports.clone(), pipe_ports)
            .with_function(Arc::new(pipe_function)),
    ];

    for nodetype in builtins {
        // Builtin definitions are static and always valid.
        registry
            .register(nodetype)
            .unwrap_or_else(|err| panic!("builtin node type failed validation: {err}"));
    }
}

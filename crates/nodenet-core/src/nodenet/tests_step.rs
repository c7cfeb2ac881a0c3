use std::sync::Arc;

use serde_json::json;

use crate::error::CoreError;
use crate::modulators::EMO_BASELINE;
use crate::nodetype::{Nodetype, NodetypeRegistry};
use crate::world::BufferWorldAdapter;

use super::{Nodenet, NodenetConfig};

fn net() -> Nodenet {
    Nodenet::new(
        "testnet",
        "tester",
        Arc::new(NodetypeRegistry::with_builtins()),
        NodenetConfig::default(),
    )
}

#[test]
fn test_step_advances_counter() {
    let mut net = net();
    assert_eq!(net.current_step(), 0);
    net.step().unwrap();
    net.step().unwrap();
    assert_eq!(net.current_step(), 2);
}

#[test]
fn test_register_propagation_weights_activation() {
    let mut net = net();
    let source = net.create_node("Register", None, None).unwrap();
    let target = net.create_node("Register", None, None).unwrap();
    net.link(source, "gen", target, "gen", 0.7, 1.0).unwrap();

    net.get_node_mut(source).unwrap().set_activation(0.9).unwrap();
    net.step().unwrap();

    let activation = net.get_node(target).unwrap().activation();
    assert!((activation - 0.63).abs() < 1e-12, "got {activation}");
}

#[test]
fn test_slot_inputs_are_frozen_per_tick() {
    // In a chain a -> b -> c, one tick moves activation exactly one hop.
    let mut net = net();
    let a = net.create_node("Register", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();
    let c = net.create_node("Register", None, None).unwrap();
    net.link(a, "gen", b, "gen", 1.0, 1.0).unwrap();
    net.link(b, "gen", c, "gen", 1.0, 1.0).unwrap();

    net.get_node_mut(a).unwrap().set_activation(1.0).unwrap();
    net.step().unwrap();
    assert_eq!(net.get_node(b).unwrap().activation(), 1.0);
    assert_eq!(net.get_node(c).unwrap().activation(), 0.0);

    net.step().unwrap();
    assert_eq!(net.get_node(c).unwrap().activation(), 1.0);
}

#[test]
fn test_is_active_follows_gate_output() {
    let mut net = net();
    let source = net.create_node("Register", None, None).unwrap();
    let target = net.create_node("Register", None, None).unwrap();
    net.link(source, "gen", target, "gen", 1.0, 1.0).unwrap();
    net.get_node_mut(source).unwrap().set_activation(1.0).unwrap();

    net.step().unwrap();
    assert!(net.get_node(target).unwrap().is_active);
    // Without sustained input the activation drains away.
    net.step().unwrap();
    net.step().unwrap();
    assert!(!net.get_node(target).unwrap().is_active);
}

#[test]
fn test_failing_node_function_does_not_abort_the_tick() {
    let registry = Arc::new(NodetypeRegistry::with_builtins());
    registry
        .register(
            Nodetype::new("Broken", vec!["gen".into()], vec!["gen".into()]).with_function(
                Arc::new(|ctx| {
                    Err(CoreError::Validation {
                        field: "broken".into(),
                        message: format!("node {} always fails", ctx.node),
                    })
                }),
            ),
        )
        .unwrap();
    let mut net = Nodenet::new("testnet", "tester", registry, NodenetConfig::default());
    let broken = net.create_node("Broken", None, None).unwrap();
    let source = net.create_node("Register", None, None).unwrap();
    let target = net.create_node("Register", None, None).unwrap();
    net.link(source, "gen", target, "gen", 1.0, 1.0).unwrap();
    net.get_node_mut(source).unwrap().set_activation(0.5).unwrap();

    net.step().unwrap();
    assert_eq!(net.current_step(), 1);
    assert!(!net.get_node(broken).unwrap().is_active);
    assert_eq!(net.get_node(target).unwrap().activation(), 0.5);
}

#[test]
fn test_actuator_writes_datatarget() {
    let mut net = net();
    net.bind_world(
        "Buffer",
        Box::new(BufferWorldAdapter::with_channels(&[], &["engine_l"])),
    );
    let source = net.create_node("Register", None, None).unwrap();
    let actuator = net.create_node("Actuator", None, None).unwrap();
    net.set_node_parameter(actuator, "datatarget", json!("engine_l")).unwrap();
    net.link(source, "gen", actuator, "gen", 1.0, 1.0).unwrap();
    net.get_node_mut(source).unwrap().set_activation(0.3).unwrap();

    net.step().unwrap();
    let world = net.worldadapter().unwrap();
    let value = world.get_datatarget_value("engine_l").unwrap();
    assert!((value - 0.3).abs() < 1e-12);
    // The actuator's gen gate mirrors the written value.
    assert!((net.get_node(actuator).unwrap().activation() - 0.3).abs() < 1e-12);
}

#[test]
fn test_sensor_reads_datasource() {
    let mut net = net();
    let mut adapter = BufferWorldAdapter::with_channels(&["brightness_l"], &[]);
    adapter.set_datasource_value("brightness_l", 0.8);
    net.bind_world("Buffer", Box::new(adapter));
    let sensor = net.create_node("Sensor", None, None).unwrap();
    net.set_node_parameter(sensor, "datasource", json!("brightness_l")).unwrap();

    net.step().unwrap();
    assert!((net.get_node(sensor).unwrap().activation() - 0.8).abs() < 1e-12);
}

#[test]
fn test_actuator_hard_sets_modulator_pseudo_datatarget() {
    let mut net = net();
    let source = net.create_node("Register", None, None).unwrap();
    let actuator = net.create_node("Actuator", None, None).unwrap();
    net.set_node_parameter(actuator, "datatarget", json!("base_importance_of_intention"))
        .unwrap();
    net.link(source, "gen", actuator, "gen", 1.0, 1.0).unwrap();
    net.get_node_mut(source).unwrap().set_activation(0.7).unwrap();

    net.step().unwrap();
    // A hard set, not a smoothed change.
    assert_eq!(net.get_modulator("base_importance_of_intention"), Some(0.7));
}

#[test]
fn test_sensor_reads_modulator_value_as_of_tick_start() {
    let mut net = net();
    let sensor = net.create_node("Sensor", None, None).unwrap();
    net.set_node_parameter(sensor, "datasource", json!("emo_activation")).unwrap();
    net.set_modulator("emo_activation", 0.6);

    net.step().unwrap();
    // The sensor saw 0.6 even though the homeostatic decay already moved the
    // live value toward baseline during the same tick.
    assert!((net.get_node(sensor).unwrap().activation() - 0.6).abs() < 1e-12);
    let live = net.get_modulator("emo_activation").unwrap();
    assert!(live < 0.6 && live > EMO_BASELINE);
}

#[test]
fn test_modulators_decay_toward_baseline() {
    let mut net = net();
    net.set_modulator("emo_activation", 1.0);
    for _ in 0..200 {
        net.step().unwrap();
    }
    let value = net.get_modulator("emo_activation").unwrap();
    assert!((value - EMO_BASELINE).abs() < 1e-3);
}

#[test]
fn test_modulators_can_be_disabled() {
    let mut net = Nodenet::new(
        "plain",
        "tester",
        Arc::new(NodetypeRegistry::with_builtins()),
        NodenetConfig {
            use_modulators: false,
        },
    );
    assert!(!net.operator_names().contains(&"modulator_decay"));
    net.set_modulator("emo_activation", 1.0);
    net.change_modulator("emo_activation", 1.0);
    assert_eq!(net.get_modulator("emo_activation"), None);
    net.step().unwrap();
    assert_eq!(net.get_modulator("emo_activation"), None);
}

#[test]
fn test_installed_operator_runs_each_tick() {
    struct AgeCounter;

    impl super::StepOperator for AgeCounter {
        fn name(&self) -> &'static str {
            "age_counter"
        }

        fn execute(&mut self, net: &mut Nodenet) -> crate::error::CoreResult<()> {
            let age = net.get_modulator("base_age").unwrap_or(0.0);
            net.set_modulator("base_age", age + 1.0);
            Ok(())
        }
    }

    let mut net = net();
    net.install_operator(Box::new(AgeCounter));
    assert!(net.operator_names().contains(&"age_counter"));

    net.step().unwrap();
    net.step().unwrap();
    net.step().unwrap();
    assert_eq!(net.get_modulator("base_age"), Some(3.0));
}

#[test]
fn test_nodenets_do_not_interfere() {
    let registry = Arc::new(NodetypeRegistry::with_builtins());
    let mut first = Nodenet::new("first", "tester", registry.clone(), NodenetConfig::default());
    let mut second = Nodenet::new("second", "tester", registry, NodenetConfig::default());

    let a = first.create_node("Register", None, None).unwrap();
    let b = first.create_node("Register", None, None).unwrap();
    first.link(a, "gen", b, "gen", 0.7, 1.0).unwrap();
    first.get_node_mut(a).unwrap().set_activation(0.9).unwrap();

    second.create_node("Register", None, None).unwrap();
    second.set_modulator("emo_activation", 0.1);

    first.step().unwrap();
    assert!((first.get_node(b).unwrap().activation() - 0.63).abs() < 1e-12);
    assert_eq!(second.current_step(), 0);
    assert_eq!(second.node_uids().len(), 1);
    assert_eq!(first.get_modulator("emo_activation"), Some(EMO_BASELINE));
}

//! Unit tests for node-type validation and registry reload semantics.

use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::error::CoreError;

fn testnode_type() -> Nodetype {
    Nodetype::new(
        "Testnode",
        vec!["gen".into(), "foo".into(), "bar".into()],
        vec!["gen".into(), "foo".into(), "bar".into()],
    )
    .with_parameters(vec![
        "linktype".into(),
        "threshold".into(),
        "protocol_mode".into(),
    ])
    .with_parameter_values("linktype", vec![json!("catexp"), json!("subsur")])
    .with_parameter_values(
        "protocol_mode",
        vec![json!("all_active"), json!("most_active_one")],
    )
    .with_parameter_default("linktype", json!("catexp"))
    .with_parameter_default("protocol_mode", json!("all_active"))
    .with_function(Arc::new(|_ctx| Ok(())))
}

#[test]
fn test_builtins_present() {
    let registry = NodetypeRegistry::with_builtins();
    for name in ["Register", "Sensor", "Actuator", "Pipe"] {
        assert!(registry.contains(name), "missing builtin {name}");
    }
    let register = registry.get("Register").unwrap();
    assert_eq!(register.gatetypes, vec!["gen".to_string()]);
    assert!(register.nodefunction.is_some());
    assert!(registry.get("Sensor").unwrap().nodefunction.is_none());
}

#[test]
fn test_register_and_resolve_native_type() {
    let registry = NodetypeRegistry::with_builtins();
    registry.register(testnode_type()).unwrap();
    let nt = registry.get("Testnode").unwrap();
    assert_eq!(nt.parameters.len(), 3);
    assert_eq!(nt.parameter_defaults["linktype"], json!("catexp"));
}

#[test]
fn test_validation_rejects_undeclared_default() {
    let bad = Nodetype::new("Bad", vec!["gen".into()], vec!["gen".into()])
        .with_parameter_default("ghost", json!(1));
    assert!(matches!(bad.validate(), Err(CoreError::Load { .. })));
}

#[test]
fn test_validation_rejects_default_outside_enumeration() {
    let bad = Nodetype::new("Bad", vec![], vec![])
        .with_parameters(vec!["mode".into()])
        .with_parameter_values("mode", vec![json!("a"), json!("b")])
        .with_parameter_default("mode", json!("c"));
    assert!(bad.validate().is_err());
}

#[test]
fn test_reload_keeps_working_types_on_failure() {
    let registry = NodetypeRegistry::with_builtins();
    registry.register(testnode_type()).unwrap();

    let broken = Nodetype::new("Testnode", vec![], vec![])
        .with_parameter_default("ghost", json!(0));
    let fine = Nodetype::new("Other", vec!["gen".into()], vec!["gen".into()]);
    let result = registry.reload(vec![broken, fine]);

    assert!(result.is_err());
    // The failing definition must not have replaced the working one.
    let survivor = registry.get("Testnode").unwrap();
    assert_eq!(survivor.parameters.len(), 3);
    // The valid definition in the same batch is installed regardless.
    assert!(registry.contains("Other"));
}

#[test]
fn test_initial_parameters_substitutes_defaults() {
    let nt = testnode_type();
    let supplied = [
        ("threshold".to_string(), json!("")),
        ("protocol_mode".to_string(), json!("most_active_one")),
    ]
    .into_iter()
    .collect();
    let params = nt.initial_parameters(&supplied).unwrap();
    assert_eq!(params["linktype"], json!("catexp"));
    assert_eq!(params["protocol_mode"], json!("most_active_one"));
    // Empty string counts as unspecified; no default is declared for it.
    assert!(!params.contains_key("threshold"));
}

#[test]
fn test_initial_parameters_rejects_undeclared_value() {
    let nt = testnode_type();
    let supplied = [("protocol_mode".to_string(), json!("everything_at_once"))]
        .into_iter()
        .collect();
    assert!(matches!(
        nt.initial_parameters(&supplied),
        Err(CoreError::Validation { .. })
    ));
}

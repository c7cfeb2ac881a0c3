use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::CoreError;
use crate::nodetype::NodetypeRegistry;
use crate::types::Relation;

use super::{Nodenet, NodenetConfig, PromptOption};

fn net() -> Nodenet {
    Nodenet::new(
        "testnet",
        "tester",
        Arc::new(NodetypeRegistry::with_builtins()),
        NodenetConfig::default(),
    )
}

#[test]
fn test_create_node_with_defaults() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    let node = net.get_node(uid).unwrap();
    assert_eq!(node.node_type, "Register");
    assert_eq!(node.name, "Register");
    assert_eq!(node.parent_nodespace, net.root_nodespace());
    assert_eq!(node.position, [0.0; 3]);
    assert!(node.get_gate("gen").is_some());
    assert!(node.get_slot("gen").is_some());
}

#[test]
fn test_create_node_unknown_type_fails() {
    let mut net = net();
    let err = net.create_node("Flurble", None, None).unwrap_err();
    assert!(matches!(err, CoreError::UnknownNodeType(_)));
    assert!(net.node_uids().is_empty());
}

#[test]
fn test_create_node_in_unknown_nodespace_fails() {
    let mut net = net();
    let err = net
        .create_node("Register", Some(Uuid::new_v4()), None)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn test_link_and_overwrite() {
    let mut net = net();
    let a = net.create_node("Register", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();

    let link = net.link(a, "gen", b, "gen", 1.0, 1.0).unwrap();
    assert_eq!(net.link_count(), 1);
    assert_eq!(link.weight, 1.0);

    // Same endpoints: weight is replaced, no second link appears.
    let link = net.link(a, "gen", b, "gen", 0.5, 0.8).unwrap();
    assert_eq!(net.link_count(), 1);
    assert_eq!(link.weight, 0.5);
    let stored = net.get_link(&link.id()).unwrap();
    assert_eq!(stored.certainty, 0.8);
}

#[test]
fn test_link_unknown_gate_fails() {
    let mut net = net();
    let a = net.create_node("Register", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();
    let err = net.link(a, "sub", b, "gen", 1.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::UnknownGateType { .. }));
    assert_eq!(net.link_count(), 0);
}

#[test]
fn test_link_with_reciprocal() {
    let mut net = net();
    let a = net.create_node("Pipe", None, None).unwrap();
    let b = net.create_node("Pipe", None, None).unwrap();

    let (forward, backward) = net.link_with_reciprocal(a, b, Relation::SubSur).unwrap();
    assert_eq!(forward.source_gate, "sub");
    assert_eq!(forward.target_node, b);
    assert_eq!(backward.source_gate, "sur");
    assert_eq!(backward.target_node, a);
    assert_eq!(net.link_count(), 2);
}

#[test]
fn test_reciprocal_requires_ports() {
    let mut net = net();
    let a = net.create_node("Pipe", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();
    assert!(net.link_with_reciprocal(a, b, Relation::PorRet).is_err());
}

#[test]
fn test_unlink_is_idempotent_for_missing_links() {
    let mut net = net();
    let a = net.create_node("Register", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();
    net.link(a, "gen", b, "gen", 1.0, 1.0).unwrap();

    net.unlink(a, "gen", b, "gen").unwrap();
    assert_eq!(net.link_count(), 0);
    // Absent link: no error.
    net.unlink(a, "gen", b, "gen").unwrap();
    // Absent node: error.
    assert!(net.unlink(Uuid::new_v4(), "gen", b, "gen").is_err());
}

#[test]
fn test_delete_node_removes_touching_links() {
    let mut net = net();
    let a = net.create_node("Register", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();
    let c = net.create_node("Register", None, None).unwrap();
    net.link(a, "gen", b, "gen", 1.0, 1.0).unwrap();
    net.link(b, "gen", c, "gen", 1.0, 1.0).unwrap();
    net.link(c, "gen", a, "gen", 1.0, 1.0).unwrap();

    net.delete_node(b).unwrap();
    assert!(!net.is_node(b));
    assert_eq!(net.link_count(), 1);
    let survivor = net.get_node(a).unwrap();
    assert!(survivor.get_gate("gen").unwrap().links().is_empty());

    let err = net.delete_node(b).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn test_nodespace_cascade_deletion() {
    let mut net = net();
    let outer = net.create_nodespace(None, "outer").unwrap();
    let inner = net.create_nodespace(Some(outer), "inner").unwrap();
    let in_outer = net.create_node("Register", Some(outer), None).unwrap();
    let in_inner = net.create_node("Register", Some(inner), None).unwrap();
    let in_root = net.create_node("Register", None, None).unwrap();
    net.link(in_root, "gen", in_inner, "gen", 1.0, 1.0).unwrap();

    net.delete_nodespace(outer).unwrap();
    assert!(!net.is_nodespace(outer));
    assert!(!net.is_nodespace(inner));
    assert!(!net.is_node(in_outer));
    assert!(!net.is_node(in_inner));
    assert!(net.is_node(in_root));
    assert_eq!(net.link_count(), 0);
}

#[test]
fn test_root_nodespace_cannot_be_deleted() {
    let mut net = net();
    let root = net.root_nodespace();
    let err = net.delete_nodespace(root).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(net.is_nodespace(root));
}

#[test]
fn test_reparent_rejects_cycles() {
    let mut net = net();
    let a = net.create_nodespace(None, "a").unwrap();
    let b = net.create_nodespace(Some(a), "b").unwrap();

    let err = net.reparent_nodespace(a, Some(b)).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    net.reparent_nodespace(b, None).unwrap();
    assert_eq!(net.get_nodespace(Some(b)).unwrap().parent, Some(net.root_nodespace()));
}

#[test]
fn test_move_node() {
    let mut net = net();
    let space = net.create_nodespace(None, "space").unwrap();
    let node = net.create_node("Register", None, None).unwrap();
    net.move_node(node, Some(space)).unwrap();
    assert_eq!(net.get_node(node).unwrap().parent_nodespace, space);
}

#[test]
fn test_set_node_parameter_empty_string_restores_default() {
    let registry = Arc::new(NodetypeRegistry::with_builtins());
    registry
        .register(
            crate::nodetype::Nodetype::new("Porter", vec![], vec![])
                .with_parameters(vec!["protocol".into(), "port".into()])
                .with_parameter_values("protocol", vec![json!("tcp"), json!("udp")])
                .with_parameter_default("protocol", json!("tcp")),
        )
        .unwrap();
    let mut net = Nodenet::new("testnet", "tester", registry, NodenetConfig::default());
    let uid = net.create_node("Porter", None, None).unwrap();
    assert_eq!(net.get_node(uid).unwrap().get_parameter("protocol"), Some(&json!("tcp")));

    net.set_node_parameter(uid, "protocol", json!("udp")).unwrap();
    assert_eq!(net.get_node(uid).unwrap().get_parameter("protocol"), Some(&json!("udp")));

    // Out-of-enumeration value is rejected, state untouched.
    let err = net.set_node_parameter(uid, "protocol", json!("icmp")).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert_eq!(net.get_node(uid).unwrap().get_parameter("protocol"), Some(&json!("udp")));

    // Empty string falls back to the declared default.
    net.set_node_parameter(uid, "protocol", json!("")).unwrap();
    assert_eq!(net.get_node(uid).unwrap().get_parameter("protocol"), Some(&json!("tcp")));

    // Empty string without a default unsets the parameter.
    net.set_node_parameter(uid, "port", json!("8080")).unwrap();
    net.set_node_parameter(uid, "port", json!("")).unwrap();
    assert_eq!(net.get_node(uid).unwrap().get_parameter("port"), None);
}

#[test]
fn test_set_node_name_and_position() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    net.set_node_name(uid, "counter").unwrap();
    net.set_node_position(uid, [10.0, 20.0, 0.0]).unwrap();
    let node = net.get_node(uid).unwrap();
    assert_eq!(node.name, "counter");
    assert_eq!(node.position, [10.0, 20.0, 0.0]);
}

#[test]
fn test_user_prompt_roundtrip() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    net.ask_user_for_parameter(
        uid,
        "please choose",
        vec![PromptOption {
            key: "foo_parameter".into(),
            label: "Please give value for \"foo\"".into(),
            values: vec![json!(23), json!(42)],
        }],
    )
    .unwrap();

    let prompt = net.user_prompt().unwrap();
    assert_eq!(prompt.node, uid);
    assert_eq!(prompt.options.len(), 1);

    let mut values = HashMap::new();
    values.insert("foo_parameter".to_string(), Value::from(42));
    net.user_prompt_response(uid, &values, true).unwrap();

    assert!(net.user_prompt().is_none());
    assert!(net.is_active());
    assert_eq!(net.get_node(uid).unwrap().get_parameter("foo_parameter"), Some(&json!(42)));
}

#[test]
fn test_notification_prompt_has_no_options() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    net.notify_user(uid, "something happened").unwrap();
    let prompt = net.user_prompt().unwrap();
    assert!(prompt.options.is_empty());
    net.user_prompt_response(uid, &HashMap::new(), false).unwrap();
    assert!(net.user_prompt().is_none());
    assert!(!net.is_active());
}

#[test]
fn test_nodespace_properties() {
    let mut net = net();
    let space = net.create_nodespace(None, "space").unwrap();
    let mut props = HashMap::new();
    props.insert("renderlinks".to_string(), json!("no"));
    net.set_nodespace_properties(Some(space), props.clone()).unwrap();
    assert_eq!(net.get_nodespace_properties(Some(space)).unwrap(), props);
    assert!(net.get_nodespace_properties(None).unwrap().is_empty());
}

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::changelog::DELETION_RETENTION_STEPS;
use crate::nodetype::NodetypeRegistry;

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
fn test_fresh_nodenet_reports_no_changes() {
    let net = net();
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    assert!(!changes.has_changes);
    assert!(changes.nodes_dirty.is_empty());
    assert!(changes.nodespaces_dirty.is_empty());
    assert!(changes.nodes_deleted.is_empty());
    assert!(changes.nodespaces_deleted.is_empty());
}

#[test]
fn test_created_node_is_dirty() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    assert!(changes.has_changes);
    let data = changes.nodes_dirty.get(&uid).unwrap();
    assert_eq!(data.node_type, "Register");
}

#[test]
fn test_from_step_filters_older_changes() {
    let mut net = net();
    net.create_node("Register", None, None).unwrap();
    net.step().unwrap();
    net.step().unwrap();
    let late = net.create_node("Register", None, None).unwrap();

    // Mutations at step 2 are invisible to a viewer synced past them.
    let changes = net.get_nodespace_changes(&[None], 3).unwrap();
    assert!(!changes.has_changes);

    let changes = net.get_nodespace_changes(&[None], 1).unwrap();
    assert_eq!(changes.nodes_dirty.len(), 1);
    assert!(changes.nodes_dirty.contains_key(&late));
}

#[test]
fn test_linking_marks_both_endpoints_dirty() {
    let mut net = net();
    let a = net.create_node("Register", None, None).unwrap();
    let b = net.create_node("Register", None, None).unwrap();
    net.step().unwrap();
    net.link(a, "gen", b, "gen", 1.0, 1.0).unwrap();

    let changes = net.get_nodespace_changes(&[None], 1).unwrap();
    assert!(changes.nodes_dirty.contains_key(&a));
    assert!(changes.nodes_dirty.contains_key(&b));
    let links = &changes.nodes_dirty[&a].links["gen"];
    assert_eq!(links[0].target_node_uid, b);
}

#[test]
fn test_deleted_node_moves_to_deleted_set() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    net.delete_node(uid).unwrap();
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    assert!(changes.nodes_dirty.is_empty());
    assert_eq!(changes.nodes_deleted, vec![uid]);
}

#[test]
fn test_deletion_leaves_the_report_after_retention_window() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    net.delete_node(uid).unwrap();

    for _ in 0..DELETION_RETENTION_STEPS {
        net.step().unwrap();
    }
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    assert_eq!(changes.nodes_deleted, vec![uid]);

    net.step().unwrap();
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    assert!(changes.nodes_deleted.is_empty());
}

#[test]
fn test_changes_are_scoped_to_queried_nodespaces() {
    let mut net = net();
    let space = net.create_nodespace(None, "space").unwrap();
    let inside = net.create_node("Register", Some(space), None).unwrap();
    let outside = net.create_node("Register", None, None).unwrap();

    let changes = net.get_nodespace_changes(&[Some(space)], 0).unwrap();
    assert!(changes.nodes_dirty.contains_key(&inside));
    assert!(!changes.nodes_dirty.contains_key(&outside));

    let changes = net.get_nodespace_changes(&[None, Some(space)], 0).unwrap();
    assert!(changes.nodes_dirty.contains_key(&inside));
    assert!(changes.nodes_dirty.contains_key(&outside));
}

#[test]
fn test_new_nodespace_appears_in_parent_query() {
    let mut net = net();
    let space = net.create_nodespace(None, "space").unwrap();
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    let data = changes.nodespaces_dirty.get(&space).unwrap();
    assert_eq!(data.name, "space");
}

#[test]
fn test_deleted_nodespace_is_reported() {
    let mut net = net();
    let space = net.create_nodespace(None, "space").unwrap();
    net.delete_nodespace(space).unwrap();
    let changes = net.get_nodespace_changes(&[None], 0).unwrap();
    assert!(!changes.nodespaces_dirty.contains_key(&space));
    assert_eq!(changes.nodespaces_deleted, vec![space]);
}

#[test]
fn test_nodespace_properties_mark_dirty() {
    let mut net = net();
    let space = net.create_nodespace(None, "space").unwrap();
    net.step().unwrap();
    let mut props = HashMap::new();
    props.insert("renderlinks".to_string(), json!("no"));
    net.set_nodespace_properties(Some(space), props).unwrap();

    let changes = net.get_nodespace_changes(&[None], 1).unwrap();
    assert!(changes.nodespaces_dirty.contains_key(&space));
}

#[test]
fn test_activation_data_tracks_structural_changes() {
    let mut net = net();
    let uid = net.create_node("Register", None, None).unwrap();
    net.get_node_mut(uid).unwrap().set_activation(0.4).unwrap();

    let data = net.get_activation_data(&[None], 0).unwrap();
    assert!(data.has_changes);
    assert_eq!(data.activations[&uid], vec![0.4]);

    net.step().unwrap();
    let data = net.get_activation_data(&[None], 1).unwrap();
    assert!(!data.has_changes);
}

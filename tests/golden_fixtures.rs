//! Deltas between the checked-in shop snapshots.

use std::path::PathBuf;

use schema_delta::command::Action;
use schema_delta::model::{snapshot_differences, Name, ObjectKind, Schema};
use schema_delta::pipeline::{load_snapshot, render_delta};
use schema_delta::config::OutputFormat;
use schema_delta::{DeltaEngine, DeltaRoot, DiffContext, ObjectFilter, TextCompiler};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures")).join(name)
}

fn shop() -> (Schema, Schema) {
    let old = load_snapshot(&fixture("shop_v1.json"), true).expect("shop_v1 loads");
    let new = load_snapshot(&fixture("shop_v2.json"), true).expect("shop_v2 loads");
    (old, new)
}

fn shop_delta() -> (Schema, Schema, DeltaRoot, DiffContext) {
    let (old, new) = shop();
    let mut ctx = DiffContext::new();
    let delta = DeltaEngine::new().delta_schemas(&old, &new, &mut ctx).expect("delta");
    (old, new, delta, ctx)
}

fn has(delta: &DeltaRoot, action: Action, kind: ObjectKind, name: &str) -> bool {
    delta
        .walk()
        .any(|c| c.action == action && c.kind == kind && c.classname == Name::from(name))
}

#[test]
fn test_fixtures_load_with_builtins() {
    let (old, new) = shop();
    assert!(old.get_by_name(&Name::from("std::str")).is_some());
    assert!(new.get_by_name(&Name::from("default::Currency")).is_some());
}

#[test]
fn test_customer_is_renamed_to_client() {
    let (_, _, delta, ctx) = shop_delta();
    let rename = delta
        .walk()
        .find(|c| c.action == Action::Rename && c.kind == ObjectKind::ObjectType)
        .expect("object type rename");
    assert_eq!(rename.classname, Name::from("default::Customer"));
    assert_eq!(rename.target_name(), &Name::from("default::Client"));
    assert_eq!(
        ctx.renamed_to(&Name::from("default::Customer")),
        Some(&Name::from("default::Client"))
    );
    assert!(!has(&delta, Action::Delete, ObjectKind::ObjectType, "default::Customer"));
}

#[test]
fn test_additions_and_drops() {
    let (_, _, delta, _) = shop_delta();
    assert!(has(&delta, Action::Create, ObjectKind::ScalarType, "default::Currency"));
    assert!(has(&delta, Action::Create, ObjectKind::Property, "default::Order.note"));
    assert!(has(&delta, Action::Delete, ObjectKind::ObjectType, "default::Legacy"));
    assert!(!has(&delta, Action::Delete, ObjectKind::ScalarType, "default::Sku"));
}

#[test]
fn test_changed_property_target_is_an_alter() {
    let (_, _, delta, _) = shop_delta();
    let total = delta
        .walk()
        .find(|c| c.kind == ObjectKind::Property && c.classname == Name::from("default::Order.total"))
        .expect("Order.total command");
    assert_eq!(total.action, Action::Alter);
    let target = total.property("target").expect("target change");
    assert!(target.is_applied());
}

#[test]
fn test_retargeted_link_needs_no_alter() {
    let (_, _, delta, _) = shop_delta();
    assert!(delta
        .walk()
        .all(|c| c.classname != Name::from("default::Order.customer")));
}

#[test]
fn test_shop_delta_round_trips() {
    let (old, new, delta, _) = shop_delta();
    let applied = delta.apply(&old, &TextCompiler::default()).expect("delta applies");
    let filter = ObjectFilter::default();
    let differences = snapshot_differences(&applied, &new, |o| filter.accepts(o)).unwrap();
    assert!(differences.is_empty(), "{differences:?}\n{delta}");
}

#[test]
fn test_dropping_legacy_is_flagged_unsafe() {
    let (_, _, delta, _) = shop_delta();
    let rendered = render_delta(&delta, OutputFormat::Prompts).unwrap();
    let drop_line = rendered
        .lines()
        .find(|l| l.contains("did you drop object type 'default::Legacy'"))
        .expect("drop prompt");
    assert!(drop_line.ends_with("(may lose data)"), "{drop_line}");
}

//! Tests for the partition/layer registry
//!
//! These tests verify:
//! - Internal partition naming and suffix stripping
//! - Partition sharing by mapping equality
//! - Layer enumeration order, duplicates included
//! - Group membership merging
//! - Metadata change tracking

use std::sync::Arc;

use fieldstore::file::{
    make_int_partition_name, strip_unique_suffix, unique_suffix, validate_name, Layer, LayerKind,
    Partition, Registry,
};
use fieldstore::{Box3i, Field, FieldMapping, MetadataValue, StoreError};

// =============================================================================
// Helper Functions
// =============================================================================

fn mapping_for(res: i32) -> Arc<FieldMapping> {
    Arc::new(FieldMapping::null().with_extents(&Box3i::from_resolution([res, res, res])))
}

/// Register `layer` under `external`, creating partitions as needed
fn add(registry: &mut Registry, external: &str, layer: &str, kind: LayerKind, res: i32) -> String {
    let int_name = registry
        .resolve_or_create(external, layer, &mapping_for(res))
        .unwrap();
    registry.add_layer(&int_name, kind, layer).unwrap();
    int_name
}

// =============================================================================
// Naming Tests
// =============================================================================

#[test]
fn test_make_and_strip() {
    for external in ["fire", "smoke_sim", "a.b", "a.3", "v2.0.1", "x."] {
        for index in [0, 1, 42] {
            let int_name = make_int_partition_name(external, index);
            assert_eq!(strip_unique_suffix(&int_name), external);
            assert_eq!(unique_suffix(&int_name), Some(index));
        }
    }
}

#[test]
fn test_strip_removes_one_suffix_only() {
    assert_eq!(strip_unique_suffix("a.3.0"), "a.3");
    assert_eq!(strip_unique_suffix("fire.12"), "fire");
    assert_eq!(strip_unique_suffix("fire"), "fire");
    assert_eq!(strip_unique_suffix("fire."), "fire.");
    assert_eq!(strip_unique_suffix("fire.1a"), "fire.1a");
    assert_eq!(unique_suffix("fire"), None);
}

#[test]
fn test_validate_name() {
    assert!(validate_name("layer", "density").is_ok());
    assert!(matches!(
        validate_name("layer", ""),
        Err(StoreError::InvalidName(_))
    ));
}

// =============================================================================
// Partition Resolution Tests
// =============================================================================

#[test]
fn test_equal_mappings_share_partition() {
    let mut registry = Registry::new();

    let a = add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    let b = add(&mut registry, "fire", "temperature", LayerKind::Scalar, 8);

    assert_eq!(a, "fire.0");
    assert_eq!(a, b);
    assert_eq!(registry.num_int_partitions("fire"), 1);
}

#[test]
fn test_different_mappings_get_new_suffix() {
    let mut registry = Registry::new();

    let a = add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    let b = add(&mut registry, "fire", "density", LayerKind::Scalar, 16);
    let c = add(&mut registry, "fire", "velocity", LayerKind::Vector, 8);

    assert_eq!(a, "fire.0");
    assert_eq!(b, "fire.1");
    assert_eq!(c, "fire.0");
    assert_eq!(registry.int_partitions_of("fire"), ["fire.0", "fire.1"]);
    assert_eq!(registry.partition_names(), ["fire"]);
}

#[test]
fn test_suffix_counter_is_per_external_name() {
    let mut registry = Registry::new();

    add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    add(&mut registry, "fire", "density", LayerKind::Scalar, 16);
    let smoke = add(&mut registry, "smoke", "density", LayerKind::Scalar, 32);

    assert_eq!(smoke, "smoke.0");
    assert_eq!(registry.partition_names(), ["fire", "smoke"]);
    assert_eq!(registry.int_partition_names(), vec!["fire.0", "fire.1", "smoke.0"]);
}

#[test]
fn test_dotted_external_name() {
    let mut registry = Registry::new();

    let int_name = add(&mut registry, "a.3", "density", LayerKind::Scalar, 4);

    assert_eq!(int_name, "a.3.0");
    assert_eq!(registry.partition_names(), ["a.3"]);
    assert_eq!(registry.scalar_layer_names("a.3"), vec!["density"]);
    assert!(registry.scalar_layer_names("a").is_empty());
}

#[test]
fn test_loaded_partitions_advance_counter() {
    let mut registry = Registry::new();
    registry
        .insert_partition(Partition::new("fire.4", mapping_for(8)))
        .unwrap();

    assert_eq!(registry.next_int_partition_name("fire"), "fire.5");
    assert_eq!(registry.next_int_partition_name("smoke"), "smoke.0");

    let name = registry
        .resolve_or_create("fire", "density", &mapping_for(16))
        .unwrap();
    assert_eq!(name, "fire.5");
}

#[test]
fn test_duplicate_partition_rejected() {
    let mut registry = Registry::new();
    registry
        .insert_partition(Partition::new("fire.0", mapping_for(8)))
        .unwrap();

    let result = registry.insert_partition(Partition::new("fire.0", mapping_for(16)));
    assert!(matches!(result, Err(StoreError::InvalidName(_))));
    assert_eq!(registry.partitions().len(), 1);
}

#[test]
fn test_resolve_rejects_empty_names() {
    let mut registry = Registry::new();

    assert!(registry.resolve_or_create("", "density", &mapping_for(8)).is_err());
    assert!(registry.resolve_or_create("fire", "", &mapping_for(8)).is_err());
    assert!(registry.partitions().is_empty());
}

#[test]
fn test_add_layer_to_unknown_partition() {
    let mut registry = Registry::new();

    let result = registry.add_layer("ghost.0", LayerKind::Scalar, "density");
    assert!(matches!(result, Err(StoreError::MissingGroup(_))));
}

#[test]
fn test_partition_lookup() {
    let mut registry = Registry::new();
    add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    add(&mut registry, "fire", "density", LayerKind::Scalar, 16);

    assert_eq!(registry.partition("fire.1").unwrap().name, "fire.1");
    assert_eq!(registry.partition("fire").unwrap().name, "fire.0");
    assert!(registry.int_partition("fire").is_none());
    assert!(registry.partition("smoke").is_none());
}

#[test]
fn test_shared_mapping_instance() {
    let mut registry = Registry::new();
    let field = Field::<f32>::dense([8, 8, 8]);

    let name = registry
        .resolve_or_create("fire", "density", field.mapping())
        .unwrap();

    let partition = registry.int_partition(&name).unwrap();
    assert!(Arc::ptr_eq(&partition.mapping, field.mapping()));
}

// =============================================================================
// Layer Enumeration Tests
// =============================================================================

#[test]
fn test_layer_names_across_partitions() {
    let mut registry = Registry::new();
    add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    add(&mut registry, "fire", "temperature", LayerKind::Scalar, 8);
    add(&mut registry, "fire", "density", LayerKind::Scalar, 16);
    add(&mut registry, "fire", "velocity", LayerKind::Vector, 8);

    assert_eq!(
        registry.scalar_layer_names("fire"),
        vec!["density", "temperature", "density"]
    );
    assert_eq!(registry.vector_layer_names("fire"), vec!["velocity"]);
    assert_eq!(registry.int_scalar_layer_names("fire.1"), vec!["density"]);
    assert!(registry.int_vector_layer_names("fire.1").is_empty());
}

#[test]
fn test_enumeration_is_repeatable() {
    let mut registry = Registry::new();
    add(&mut registry, "b", "x", LayerKind::Scalar, 4);
    add(&mut registry, "a", "y", LayerKind::Scalar, 4);
    add(&mut registry, "b", "z", LayerKind::Scalar, 8);

    let first: Vec<Layer> = registry
        .layers(LayerKind::Scalar, None)
        .into_iter()
        .cloned()
        .collect();
    let second: Vec<Layer> = registry
        .layers(LayerKind::Scalar, None)
        .into_iter()
        .cloned()
        .collect();

    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|l| l.parent()).collect::<Vec<_>>(),
        vec!["b.0", "a.0", "b.1"]
    );
}

#[test]
fn test_duplicate_layer_names_kept() {
    let mut partition = Partition::new("fire.0", mapping_for(8));
    partition.add_vector_layer(Layer::new("velocity", "fire.0"));
    partition.add_vector_layer(Layer::new("velocity", "fire.0"));
    partition.add_scalar_layer(Layer::new("density", "fire.0"));

    assert_eq!(partition.vector_layer_names(), vec!["velocity", "velocity"]);
    assert_eq!(partition.layer_count(), 3);
    assert_eq!(
        partition.vector_layer("velocity").map(Layer::parent),
        Some("fire.0")
    );
    assert!(partition.scalar_layer("velocity").is_none());
}

#[test]
fn test_clear() {
    let mut registry = Registry::new();
    add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    registry.add_group_membership([("g", "fire.0:density")]);
    registry.set_metadata("k", 1);

    registry.clear();

    assert!(registry.partitions().is_empty());
    assert!(registry.partition_names().is_empty());
    assert!(registry.group_membership().is_empty());
    assert!(registry.metadata().is_empty());
    assert_eq!(registry.next_int_partition_name("fire"), "fire.0");
}

#[test]
fn test_display_lists_hierarchy() {
    let mut registry = Registry::new();
    add(&mut registry, "fire", "density", LayerKind::Scalar, 8);
    add(&mut registry, "fire", "velocity", LayerKind::Vector, 8);

    let text = registry.to_string();
    assert!(text.contains("fire.0 (fire)"));
    assert!(text.contains("scalar: density"));
    assert!(text.contains("vector: velocity"));
}

// =============================================================================
// Group Membership Tests
// =============================================================================

#[test]
fn test_group_membership_merges() {
    let mut registry = Registry::new();

    registry.add_group_membership([("explosion", "fire.0:density")]);
    registry.add_group_membership([
        ("explosion", "fire.1:density"),
        ("wisps", "smoke.0:density"),
    ]);

    assert_eq!(
        registry.group_membership().get("explosion").map(String::as_str),
        Some("fire.0:density fire.1:density")
    );
    assert_eq!(
        registry.group_members("explosion"),
        vec!["fire.0:density", "fire.1:density"]
    );
    assert_eq!(registry.group_members("wisps"), vec!["smoke.0:density"]);
    assert!(registry.group_members("missing").is_empty());
}

#[test]
fn test_group_membership_keeps_duplicates() {
    let mut registry = Registry::new();

    registry.add_group_membership([("g", "a:b")]);
    registry.add_group_membership([("g", "a:b")]);

    assert_eq!(registry.group_members("g"), vec!["a:b", "a:b"]);
}

#[test]
fn test_blank_group_membership_ignored() {
    let mut registry = Registry::new();

    registry.add_group_membership([("g", "   "), ("h", "")]);
    assert!(registry.group_membership().is_empty());

    registry.add_group_membership([("g", " a:b "), ("g", "\t")]);
    assert_eq!(
        registry.group_membership().get("g").map(String::as_str),
        Some("a:b")
    );
    assert_eq!(registry.group_membership().len(), 1);
}

// =============================================================================
// Metadata Tests
// =============================================================================

#[test]
fn test_metadata_change_tracking() {
    let mut registry = Registry::new();

    registry.set_metadata("author", "sim");
    registry.set_metadata("frame", 10);
    registry.set_metadata("author", "render");

    assert_eq!(registry.changed_metadata(), ["author", "frame"]);
    assert_eq!(registry.metadata().str_value("author"), Some("render"));
}

#[test]
fn test_remove_metadata() {
    let mut registry = Registry::new();

    assert!(registry.remove_metadata("missing").is_none());
    assert!(registry.changed_metadata().is_empty());

    registry.set_metadata("k", 2.5f32);
    assert_eq!(registry.remove_metadata("k"), Some(MetadataValue::Float(2.5)));
    assert!(registry.metadata().is_empty());
}

#[test]
fn test_metadata_hook_callable_directly() {
    let mut registry = Registry::new();

    registry.metadata_has_changed("external");
    registry.metadata_has_changed("external");

    assert_eq!(registry.changed_metadata(), ["external"]);
}

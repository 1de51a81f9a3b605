//! Collection manager facade integration tests against the mock backend.

mod common;

use common::native_context;

use ruvector_bridge::{CollectionConfig, CollectionManager, DistanceMetric};

fn ready_manager() -> CollectionManager {
    let (_, ctx) = native_context();
    let mut manager = CollectionManager::new();
    manager.init_with(ctx).unwrap();
    manager
}

// =============================================================================
// Collection CRUD
// =============================================================================

#[test]
fn test_create_list_get() {
    let manager = ready_manager();
    manager.create(CollectionConfig::new("docs", 384)).unwrap();
    manager.create(CollectionConfig::new("images", 512)).unwrap();

    let collections = manager.list().unwrap();
    assert_eq!(collections.len(), 2);

    let docs = manager.get("docs").unwrap().expect("docs should exist");
    assert_eq!(docs.dimensions, 384);
    assert_eq!(docs.metric, DistanceMetric::Cosine);
    assert_eq!(docs.vector_count, 0);
}

#[test]
fn test_get_absent_is_none() {
    let manager = ready_manager();
    assert!(manager.get("nope").unwrap().is_none());
    assert!(!manager.exists("nope").unwrap());
}

#[test]
fn test_duplicate_name_rejected_by_backend() {
    let manager = ready_manager();
    manager.create(CollectionConfig::new("docs", 128)).unwrap();
    let err = manager.create(CollectionConfig::new("docs", 128)).unwrap_err();
    assert!(err.to_string().contains("docs"));
}

#[test]
fn test_delete_reports_existence() {
    let manager = ready_manager();
    manager.create(CollectionConfig::new("docs", 128)).unwrap();

    assert!(manager.delete("docs").unwrap());
    assert!(!manager.delete("docs").unwrap());
    assert!(!manager.exists("docs").unwrap());
}

#[test]
fn test_invalid_config_rejected_before_backend() {
    let (backend, ctx) = native_context();
    let mut manager = CollectionManager::new();
    manager.init_with(ctx).unwrap();
    let calls_before = backend.call_count();

    let err = manager.create(CollectionConfig::new("", 128)).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(backend.call_count(), calls_before);
}

// =============================================================================
// Aliases
// =============================================================================

#[test]
fn test_alias_create_and_repoint() {
    let manager = ready_manager();
    manager.create(CollectionConfig::new("docs_v1", 128)).unwrap();
    manager.create(CollectionConfig::new("docs_v2", 128)).unwrap();

    manager.create_alias("docs", "docs_v1").unwrap();
    // Blue/green: re-binding re-points atomically
    manager.create_alias("docs", "docs_v2").unwrap();

    let aliases = manager.list_aliases().unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].alias, "docs");
    assert_eq!(aliases[0].collection, "docs_v2");
}

#[test]
fn test_alias_to_missing_collection_rejected() {
    let manager = ready_manager();
    assert!(manager.create_alias("docs", "ghost").is_err());
}

#[test]
fn test_alias_delete_leaves_collection() {
    let manager = ready_manager();
    manager.create(CollectionConfig::new("docs", 128)).unwrap();
    manager.create_alias("latest", "docs").unwrap();

    assert!(manager.delete_alias("latest").unwrap());
    assert!(!manager.delete_alias("latest").unwrap());
    assert!(manager.exists("docs").unwrap());
}

#[test]
fn test_deleting_collection_drops_its_aliases() {
    let manager = ready_manager();
    manager.create(CollectionConfig::new("docs", 128)).unwrap();
    manager.create_alias("latest", "docs").unwrap();

    manager.delete("docs").unwrap();
    assert!(manager.list_aliases().unwrap().is_empty());
}

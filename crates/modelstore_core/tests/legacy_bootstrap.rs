use modelstore_core::{
    Document, DocumentStore, FileDocumentStore, StoreConfig, CURRENT_SCHEMA_VERSION,
    FLOOR_SCHEMA_VERSION,
};
use serde_json::json;
use std::fs;
use std::path::Path;
use uuid::Uuid;

fn seed_legacy_root(legacy: &Path) {
    fs::create_dir_all(legacy).unwrap();
    fs::write(
        legacy.join("alpha.json"),
        json!({
            "manifest": {"id": "alpha", "name": "Alpha", "createdAt": "2021-06-01T00:00:00Z"},
            "elements": [{"id": Uuid::new_v4(), "type": "Requirement", "name": "Shall pump", "text": "10 l/s"}]
        })
        .to_string(),
    )
    .unwrap();
    fs::write(
        legacy.join("bravo plan.json"),
        json!({
            "manifest": {
                "name": "Bravo",
                "version": 5,
                "createdAt": "2023-02-01T00:00:00Z",
                "updatedAt": "2023-02-02T00:00:00Z",
                "schemaVersion": "1.1.0",
                "kind": "model"
            },
            "metadata": {"ownerId": "user-1", "archived": true, "labels": []},
            "elements": [],
            "relationships": [],
            "diagrams": []
        })
        .to_string(),
    )
    .unwrap();
    fs::write(legacy.join("corrupt.json"), "{ not json").unwrap();
    fs::write(
        legacy.join("future.json"),
        json!({"manifest": {"id": "future", "name": "Future", "schemaVersion": "7.0.0"}}).to_string(),
    )
    .unwrap();
    fs::write(legacy.join("readme.txt"), "not a document").unwrap();
}

#[test]
fn bootstrap_imports_new_entries_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    seed_legacy_root(&legacy);
    let config = StoreConfig::new(dir.path().join("store")).with_legacy_root(&legacy);
    let store = FileDocumentStore::open(config).unwrap();

    let report = store.bootstrap_legacy().unwrap();
    assert_eq!(
        report.imported,
        vec!["alpha".to_string(), "bravo_plan".to_string()]
    );
    assert!(report.skipped.is_empty());
    let failed: Vec<_> = report.failed.iter().map(|f| f.entry.as_str()).collect();
    assert_eq!(failed, vec!["corrupt.json", "future.json"]);

    let alpha = store.get("alpha").unwrap().unwrap();
    assert_eq!(alpha.manifest.version, 1);
    assert_eq!(alpha.manifest.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(
        alpha.manifest.migrated_from_version.as_deref(),
        Some(FLOOR_SCHEMA_VERSION)
    );
    assert_eq!(alpha.model().unwrap().elements.len(), 1);

    let bravo = store.get("bravo_plan").unwrap().unwrap();
    assert_eq!(bravo.manifest.version, 5);
    assert_eq!(bravo.manifest.migrated_from_version.as_deref(), Some("1.1.0"));
    let metadata = store.get_metadata("bravo_plan").unwrap().unwrap();
    assert!(metadata.archived);
    assert_eq!(metadata.owner_id.as_deref(), Some("user-1"));
}

#[test]
fn bootstrap_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    seed_legacy_root(&legacy);
    let config = StoreConfig::new(dir.path().join("store")).with_legacy_root(&legacy);
    let store = FileDocumentStore::open(config).unwrap();

    store.bootstrap_legacy().unwrap();
    let before: Vec<_> = store.list().unwrap();

    let second = store.bootstrap_legacy().unwrap();
    assert!(second.imported.is_empty());
    assert_eq!(
        second.skipped,
        vec!["alpha".to_string(), "bravo_plan".to_string()]
    );
    assert_eq!(store.list().unwrap(), before);
}

#[test]
fn existing_documents_are_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    seed_legacy_root(&legacy);
    let config = StoreConfig::new(dir.path().join("store")).with_legacy_root(&legacy);
    let store = FileDocumentStore::open(config).unwrap();
    store
        .create(&Document::new_model("alpha", "Newer alpha"), None)
        .unwrap();

    let report = store.bootstrap_legacy().unwrap();
    assert_eq!(report.skipped, vec!["alpha".to_string()]);
    assert_eq!(
        store.get("alpha").unwrap().unwrap().manifest.name,
        "Newer alpha"
    );
}

#[test]
fn missing_legacy_location_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDocumentStore::open(StoreConfig::new(dir.path())).unwrap();
    assert_eq!(store.bootstrap_legacy().unwrap(), Default::default());

    let config = StoreConfig::new(dir.path()).with_legacy_root(dir.path().join("nowhere"));
    let store = FileDocumentStore::open(config).unwrap();
    let report = store.bootstrap_legacy().unwrap();
    assert!(report.imported.is_empty() && report.failed.is_empty());
}

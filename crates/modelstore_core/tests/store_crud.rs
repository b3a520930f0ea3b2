use modelstore_core::model::diagram::{Diagram, DiagramKind, DiagramNode, NodeKind};
use modelstore_core::model::element::{Element, ElementKind};
use modelstore_core::model::relationship::Relationship;
use modelstore_core::{
    Document, DocumentMetadata, DocumentStore, DocumentValidationError, DuplicateRequest,
    FileDocumentStore, StoreConfig, StoreError, CURRENT_SCHEMA_VERSION,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn open_store(root: &Path) -> FileDocumentStore {
    FileDocumentStore::open(StoreConfig::new(root)).unwrap()
}

fn sample_model(id: &str) -> Document {
    let mut document = Document::new_model(id, "Pump skid");
    let model = document.model_mut().unwrap();
    let skid = Element::new(ElementKind::Block, "Skid");
    let inlet = Element::new(ElementKind::port(), "Inlet").owned_by(skid.id);
    let outlet = Element::new(ElementKind::port(), "Outlet").owned_by(skid.id);
    let connector = Relationship::connector(inlet.id, outlet.id);
    let mut diagram = Diagram::new("Skid IBD", DiagramKind::Ibd, skid.id);
    diagram.context_block_id = Some(skid.id);
    diagram.nodes.push(DiagramNode::new(skid.id, NodeKind::Block));
    model.elements.extend([skid, inlet, outlet]);
    model.relationships.push(connector);
    model.diagrams.push(diagram);
    document
}

#[test]
fn create_then_get_returns_same_payload_at_version_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let document = sample_model("pump");

    let manifest = store.create(&document, None).unwrap();
    assert_eq!(manifest.id, "pump");
    assert_eq!(manifest.version, 1);
    assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);

    let loaded = store.get("pump").unwrap().unwrap();
    assert_eq!(loaded.payload, document.payload);
    assert_eq!(loaded.manifest, manifest);
}

#[test]
fn second_create_with_same_id_gets_numeric_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    let first = store.create(&Document::new_model("demo", "One"), None).unwrap();
    let second = store.create(&Document::new_model("demo", "Two"), None).unwrap();
    assert_eq!(first.id, "demo");
    assert_eq!(second.id, "demo-2");

    let ids: HashSet<_> = store.list().unwrap().into_iter().map(|m| m.id).collect();
    assert!(ids.contains("demo"));
    assert!(ids.contains("demo-2"));
    assert_eq!(store.get("demo").unwrap().unwrap().manifest.name, "One");
    assert_eq!(store.get("demo-2").unwrap().unwrap().manifest.name, "Two");
}

#[test]
fn requested_id_is_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let manifest = store
        .create(&Document::new_model("my model/v2", "Model"), None)
        .unwrap();
    assert_eq!(manifest.id, "my_model_v2");
    assert!(dir.path().join("my_model_v2").join("manifest.json").exists());

    let manifest = store
        .create(&Document::new_model(" padded ", "Padded"), None)
        .unwrap();
    assert_eq!(manifest.id, "_padded_");
}

#[test]
fn stale_version_save_is_rejected_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();

    let loaded = store.get("demo").unwrap().unwrap();
    let mut first_edit = loaded.clone();
    first_edit.manifest.name = "First".to_string();
    let saved = store.save(&first_edit, Some(1), None).unwrap();
    assert_eq!(saved.version, 2);

    let mut second_edit = loaded.clone();
    second_edit.manifest.name = "Second".to_string();
    let err = store.save(&second_edit, Some(1), None).unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            expected: 1,
            actual: 2,
            ..
        }
    ));

    let err = store.save(&second_edit, None, None).unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));
    assert_eq!(store.get("demo").unwrap().unwrap().manifest.name, "First");
}

#[test]
fn save_increments_version_and_preserves_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let created = store.create(&sample_model("demo"), None).unwrap();

    let mut document = store.get("demo").unwrap().unwrap();
    document.manifest.created_at = chrono::Utc::now() + chrono::Duration::days(3);
    document
        .model_mut()
        .unwrap()
        .elements
        .push(Element::new(ElementKind::Signal, "Flow"));
    let saved = store.save(&document, None, None).unwrap();

    assert_eq!(saved.version, 2);
    assert_eq!(saved.created_at, created.created_at);
    assert!(saved.updated_at >= created.updated_at);

    let reloaded = store.get("demo").unwrap().unwrap();
    assert_eq!(reloaded.manifest.version, 2);
    assert_eq!(reloaded.model().unwrap().elements.len(), 4);
}

#[test]
fn save_of_unknown_document_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let err = store
        .save(&Document::new_model("ghost", "Ghost"), None, None)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref id, .. } if id == "ghost"));
}

#[test]
fn save_rejects_other_schema_versions_and_invalid_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();

    let mut document = store.get("demo").unwrap().unwrap();
    document.manifest.schema_version = "1.0.0".to_string();
    let err = store.save(&document, None, None).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation {
            source: DocumentValidationError::SchemaVersionMismatch { .. },
            ..
        }
    ));

    let mut document = store.get("demo").unwrap().unwrap();
    let duplicate = document.model().unwrap().elements[0].clone();
    document.model_mut().unwrap().elements.push(duplicate);
    let err = store.save(&document, None, None).unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
    assert_eq!(store.get("demo").unwrap().unwrap().manifest.version, 1);
}

#[test]
fn failed_save_leaves_every_stored_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();
    let doc_dir = dir.path().join("demo");
    let snapshot = |name: &str| fs::read(doc_dir.join(name)).unwrap();
    let before: Vec<_> = ["manifest.json", "model.json", "diagrams.json"]
        .into_iter()
        .map(snapshot)
        .collect();

    // A plain file where the staging directory belongs makes every rewrite fail.
    let staging = dir.path().join(".staging");
    fs::remove_dir_all(&staging).unwrap();
    fs::write(&staging, "blocked").unwrap();

    let mut document = store.get("demo").unwrap().unwrap();
    document.manifest.name = "Renamed".to_string();
    document.model_mut().unwrap().elements.truncate(1);
    let err = store.save(&document, Some(1), None).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));

    let after: Vec<_> = ["manifest.json", "model.json", "diagrams.json"]
        .into_iter()
        .map(snapshot)
        .collect();
    assert_eq!(after, before);

    fs::remove_file(&staging).unwrap();
    let saved = store.save(&document, Some(1), None).unwrap();
    assert_eq!(saved.version, 2);
    assert_eq!(
        store.get("demo").unwrap().unwrap().model().unwrap().elements.len(),
        1
    );
}

#[test]
fn save_keeps_unrelated_files_and_leaves_no_staging_residue() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();
    fs::write(dir.path().join("demo").join("notes.txt"), "keep me").unwrap();

    let document = store.get("demo").unwrap().unwrap();
    store.save(&document, Some(1), None).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("demo").join("notes.txt")).unwrap(),
        "keep me"
    );
    let residue = fs::read_dir(dir.path().join(".staging")).unwrap().count();
    assert_eq!(residue, 0);
}

#[test]
fn corrupted_stored_version_is_invalid_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();
    let document = store.get("demo").unwrap().unwrap();

    let manifest_path = dir.path().join("demo").join("manifest.json");
    let mut manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).unwrap()).unwrap();
    manifest["version"] = serde_json::json!("3");
    fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();
    let before = fs::read(&manifest_path).unwrap();

    let err = store.save(&document, Some(1), None).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { ref id, .. } if id == "demo"));
    assert_eq!(fs::read(&manifest_path).unwrap(), before);
}

#[test]
fn save_never_rewrites_migration_origin() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();

    let mut document = store.get("demo").unwrap().unwrap();
    document.manifest.migrated_from_version = Some("0.5.0".to_string());
    let saved = store.save(&document, None, None).unwrap();
    assert_eq!(saved.migrated_from_version, None);
    assert_eq!(
        store.get("demo").unwrap().unwrap().manifest.migrated_from_version,
        None
    );
}

#[test]
fn delete_removes_directory_and_reports_absence() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();

    assert!(store.delete("demo").unwrap());
    assert!(!dir.path().join("demo").exists());
    assert!(store.get("demo").unwrap().is_none());
    assert!(!store.delete("demo").unwrap());
}

#[test]
fn duplicate_copies_payload_into_independent_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let source = sample_model("demo");
    store.create(&source, None).unwrap();
    let mut edited = store.get("demo").unwrap().unwrap();
    edited.manifest.description = "edited".to_string();
    store.save(&edited, None, None).unwrap();

    let copy = store
        .duplicate("demo", &DuplicateRequest::default(), None)
        .unwrap();
    assert_eq!(copy.id, "demo-2");
    assert_eq!(copy.version, 1);
    assert_eq!(copy.description, "edited");

    let named = store
        .duplicate(
            "demo",
            &DuplicateRequest {
                id: Some("variant".to_string()),
                name: Some("Variant".to_string()),
                description: None,
            },
            None,
        )
        .unwrap();
    assert_eq!(named.id, "variant");
    assert_eq!(named.name, "Variant");

    let copied = store.get("demo-2").unwrap().unwrap();
    assert_eq!(copied.payload, source.payload);
    assert_eq!(store.get("demo").unwrap().unwrap().manifest.version, 2);

    let err = store
        .duplicate("missing", &DuplicateRequest::default(), None)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn list_orders_by_update_and_skips_unreadable_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&Document::new_model("alpha", "Alpha"), None).unwrap();
    store.create(&Document::new_model("beta", "Beta"), None).unwrap();
    let alpha = store.get("alpha").unwrap().unwrap();
    store.save(&alpha, None, None).unwrap();

    fs::create_dir_all(dir.path().join("broken")).unwrap();
    fs::write(dir.path().join("broken").join("manifest.json"), "{ nope").unwrap();
    fs::create_dir_all(dir.path().join("empty")).unwrap();
    fs::write(dir.path().join("stray.json"), "{}").unwrap();

    let ids: Vec<_> = store.list().unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["alpha".to_string(), "beta".to_string()]);

    let err = store.get("broken").unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { .. }));
}

#[test]
fn metadata_sidecar_is_stored_apart_and_defaults_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let metadata = DocumentMetadata {
        owner_id: Some("user-7".to_string()),
        archived: false,
        labels: vec!["draft".to_string()],
    };
    store
        .create(&Document::new_model("owned", "Owned"), Some(&metadata))
        .unwrap();
    store.create(&Document::new_model("plain", "Plain"), None).unwrap();

    assert_eq!(store.get_metadata("owned").unwrap(), Some(metadata.clone()));
    assert_eq!(
        store.get_metadata("plain").unwrap(),
        Some(DocumentMetadata::default())
    );
    assert_eq!(store.get_metadata("missing").unwrap(), None);

    let document = store.get("owned").unwrap().unwrap();
    store.save(&document, None, None).unwrap();
    assert_eq!(store.get_metadata("owned").unwrap(), Some(metadata));
}

#[test]
fn grid_documents_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let manifest = store
        .create(&Document::new_grid("layout", "Layout"), None)
        .unwrap();
    assert!(dir.path().join("layout").join("grid.json").exists());
    assert!(!dir.path().join("layout").join("model.json").exists());

    let loaded = store.get(&manifest.id).unwrap().unwrap();
    assert!(loaded.grid().is_some());
}

#[test]
fn concurrent_creates_never_share_an_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    let ids: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| store.create(&Document::new_model("demo", "Demo"), None)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap().id)
            .collect()
    });

    let unique: HashSet<_> = ids.iter().cloned().collect();
    assert_eq!(unique.len(), 8);
    assert!(unique.contains("demo"));
    assert_eq!(store.list().unwrap().len(), 8);
}

#[test]
fn concurrent_saves_with_same_token_admit_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.create(&sample_model("demo"), None).unwrap();
    let loaded = store.get("demo").unwrap().unwrap();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..6)
            .map(|_| scope.spawn(|| store.save(&loaded, Some(1), None)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results.iter().all(|result| match result {
        Ok(manifest) => manifest.version == 2,
        Err(err) => matches!(err, StoreError::VersionConflict { actual: 2, .. }),
    }));
}

//! Legacy single-file document source.
//!
//! A legacy location holds one `<name>.json` per document, each a single
//! object `{manifest, metadata?, ...payload}`.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ids::sanitize_document_id;
use super::layout::{read_json, LayoutError};
use crate::migration::RawDocument;
use crate::model::document::DocumentMetadata;

const METADATA_KEY: &str = "metadata";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct LegacyEntry {
    pub file_name: String,
    pub stem: String,
    pub path: PathBuf,
}

/// Lists `*.json` files under `root`, sorted by file name. A missing root is
/// treated as empty.
pub(super) fn scan(root: &Path) -> io::Result<Vec<LegacyEntry>> {
    let read_dir = match fs::read_dir(root) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        entries.push(LegacyEntry {
            file_name: dir_entry.file_name().to_string_lossy().into_owned(),
            stem: stem.to_string(),
            path,
        });
    }
    entries.sort_by(|left, right| left.file_name.cmp(&right.file_name));
    Ok(entries)
}

/// Reads one entry into raw form.
pub(super) fn read_entry(entry: &LegacyEntry) -> Result<RawDocument, LayoutError> {
    match read_json(&entry.path)? {
        Some(value) => Ok(RawDocument::from_combined(value)),
        None => Err(LayoutError::Io {
            path: entry.path.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "legacy entry vanished during import"),
        }),
    }
}

/// Removes an embedded metadata object from the payload. Malformed metadata is
/// dropped rather than failing the import.
pub(super) fn take_metadata(raw: &mut RawDocument) -> Option<DocumentMetadata> {
    let value = raw.payload.as_object_mut()?.remove(METADATA_KEY)?;
    match value {
        Value::Null => None,
        other => serde_json::from_value(other).ok(),
    }
}

/// Store id for an entry: the manifest id if present, else the file stem.
pub(super) fn entry_id(raw: &RawDocument, entry: &LegacyEntry) -> String {
    let requested = raw
        .manifest_str("id")
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(entry.stem.as_str());
    sanitize_document_id(requested)
}

#[cfg(test)]
mod tests {
    use super::{entry_id, scan, take_metadata};
    use crate::migration::RawDocument;
    use serde_json::json;
    use std::fs;

    #[test]
    fn scan_sorts_json_files_and_ignores_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let names: Vec<_> = scan(dir.path())
            .unwrap()
            .into_iter()
            .map(|entry| entry.file_name)
            .collect();
        assert_eq!(names, vec!["a.json".to_string(), "b.json".to_string()]);
        assert!(scan(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn id_falls_back_to_sanitized_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old plan.json"), "{}").unwrap();
        let entry = scan(dir.path()).unwrap().remove(0);

        let raw = RawDocument::from_combined(json!({"manifest": {"name": "Plan"}}));
        assert_eq!(entry_id(&raw, &entry), "old_plan");

        let raw = RawDocument::from_combined(json!({"manifest": {"id": "plan-7"}}));
        assert_eq!(entry_id(&raw, &entry), "plan-7");

        let raw = RawDocument::from_combined(json!({"manifest": {"id": " plan 7 "}}));
        assert_eq!(entry_id(&raw, &entry), "_plan_7_");

        let raw = RawDocument::from_combined(json!({"manifest": {"id": "  "}}));
        assert_eq!(entry_id(&raw, &entry), "old_plan");
    }

    #[test]
    fn metadata_is_split_from_payload() {
        let mut raw = RawDocument::from_combined(json!({
            "manifest": {"id": "x"},
            "metadata": {"ownerId": "u1", "labels": ["a"]},
            "elements": []
        }));
        let metadata = take_metadata(&mut raw).unwrap();
        assert_eq!(metadata.owner_id.as_deref(), Some("u1"));
        assert!(raw.payload.get("metadata").is_none());
        assert!(raw.payload.get("elements").is_some());
    }
}

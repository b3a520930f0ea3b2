//! On-disk layout of one document directory.
//!
//! # Invariants
//! - Every file is written to a sibling temp file and renamed into place.
//! - `manifest.json` is written after the payload files, so a directory with a
//!   manifest always has its payload.
//! - Full document writes target a staging directory; live directories are only
//!   ever swapped whole.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{StoreError, StoreOp};
use crate::migration::RawDocument;
use crate::model::diagram::Diagram;
use crate::model::document::{Document, DocumentMetadata, DocumentPayload, Manifest};
use crate::model::element::Element;
use crate::model::relationship::Relationship;

pub(super) const MANIFEST_FILE: &str = "manifest.json";
pub(super) const MODEL_FILE: &str = "model.json";
pub(super) const DIAGRAMS_FILE: &str = "diagrams.json";
pub(super) const GRID_FILE: &str = "grid.json";
pub(super) const METADATA_FILE: &str = "metadata.json";
pub(super) const STAGING_DIR: &str = ".staging";

#[derive(Serialize)]
struct ModelFile<'a> {
    elements: &'a [Element],
    relationships: &'a [Relationship],
}

#[derive(Serialize)]
struct DiagramsFile<'a> {
    diagrams: &'a [Diagram],
}

/// Low-level layout failure, mapped to `StoreError` by the caller.
#[derive(Debug)]
pub(super) enum LayoutError {
    Io { path: PathBuf, source: io::Error },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl LayoutError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(super) fn into_store_error(self, op: StoreOp, id: &str) -> StoreError {
        match self {
            Self::Io { path, source } => StoreError::Io {
                op,
                id: Some(id.to_string()),
                path,
                source,
            },
            Self::Parse { path, source } => StoreError::InvalidData {
                op,
                id: id.to_string(),
                message: format!("`{}`: {source}", path.display()),
            },
        }
    }
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "invalid json in `{}`: {source}", path.display())
            }
        }
    }
}

/// Reads and parses one JSON file; `Ok(None)` when it does not exist.
pub(super) fn read_json(path: &Path) -> Result<Option<Value>, LayoutError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(LayoutError::io(path, err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| LayoutError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Serializes `value` and atomically replaces `path` with it.
pub(super) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), LayoutError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| LayoutError::io(path, io::Error::new(io::ErrorKind::InvalidData, err)))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes).map_err(|err| LayoutError::io(&tmp, err))?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(LayoutError::io(path, err));
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), LayoutError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(LayoutError::io(path, err)),
    }
}

/// Reads manifest plus merged payload files; `Ok(None)` without a manifest.
pub(super) fn read_raw(dir: &Path) -> Result<Option<RawDocument>, LayoutError> {
    let Some(manifest) = read_json(&dir.join(MANIFEST_FILE))? else {
        return Ok(None);
    };

    let grid_path = dir.join(GRID_FILE);
    let is_grid = match manifest.get("kind").and_then(Value::as_str) {
        Some(kind) => kind == "grid",
        None => grid_path.exists() && !dir.join(MODEL_FILE).exists(),
    };

    let payload = if is_grid {
        read_json(&grid_path)?.unwrap_or_else(|| Value::Object(Map::new()))
    } else {
        let mut merged = Map::new();
        for file in [MODEL_FILE, DIAGRAMS_FILE] {
            if let Some(Value::Object(part)) = read_json(&dir.join(file))? {
                merged.extend(part);
            }
        }
        Value::Object(merged)
    };
    Ok(Some(RawDocument::new(manifest, payload)))
}

pub(super) fn read_metadata(dir: &Path) -> Result<Option<DocumentMetadata>, LayoutError> {
    let path = dir.join(METADATA_FILE);
    let Some(value) = read_json(&path)? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| LayoutError::Parse { path, source })
}

pub(super) fn write_metadata(dir: &Path, metadata: &DocumentMetadata) -> Result<(), LayoutError> {
    write_json_atomic(&dir.join(METADATA_FILE), metadata)
}

/// Writes payload files for the document's kind and drops the other kind's.
pub(super) fn write_payload(dir: &Path, document: &Document) -> Result<(), LayoutError> {
    match &document.payload {
        DocumentPayload::Model(model) => {
            write_json_atomic(
                &dir.join(MODEL_FILE),
                &ModelFile {
                    elements: &model.elements,
                    relationships: &model.relationships,
                },
            )?;
            write_json_atomic(
                &dir.join(DIAGRAMS_FILE),
                &DiagramsFile {
                    diagrams: &model.diagrams,
                },
            )?;
            remove_if_present(&dir.join(GRID_FILE))
        }
        DocumentPayload::Grid(grid) => {
            write_json_atomic(&dir.join(GRID_FILE), grid)?;
            remove_if_present(&dir.join(MODEL_FILE))?;
            remove_if_present(&dir.join(DIAGRAMS_FILE))
        }
    }
}

pub(super) fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<(), LayoutError> {
    write_json_atomic(&dir.join(MANIFEST_FILE), manifest)
}

/// Full document write: payload, then metadata when given, manifest last.
pub(super) fn write_document(
    dir: &Path,
    document: &Document,
    metadata: Option<&DocumentMetadata>,
) -> Result<(), LayoutError> {
    write_payload(dir, document)?;
    if let Some(metadata) = metadata {
        write_metadata(dir, metadata)?;
    }
    write_manifest(dir, &document.manifest)
}

/// Copies files a document write does not own (the metadata sidecar and any
/// unknown files) from `from` into `to`. Temp files and subdirectories are
/// skipped.
pub(super) fn copy_sidecars(from: &Path, to: &Path) -> Result<(), LayoutError> {
    let entries = fs::read_dir(from).map_err(|err| LayoutError::io(from, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| LayoutError::io(from, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let owned = [MANIFEST_FILE, MODEL_FILE, DIAGRAMS_FILE, GRID_FILE].contains(&name.as_str());
        if owned || name.starts_with('.') || !entry.path().is_file() {
            continue;
        }
        fs::copy(entry.path(), to.join(&name)).map_err(|err| LayoutError::io(&entry.path(), err))?;
    }
    Ok(())
}

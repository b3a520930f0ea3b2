//! Document, manifest and metadata records.
//!
//! # Responsibility
//! - Define the manifest stored in `manifest.json`.
//! - Pair a manifest with one of the two supported payload shapes.
//!
//! # Invariants
//! - `manifest.kind` names the payload shape carried by the document.
//! - `manifest.version` starts at 1 and only the store increments it.
//! - Unknown manifest keys survive a read/write cycle through `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::diagram::Diagram;
use super::element::Element;
use super::grid::GridPayload;
use super::relationship::Relationship;
use super::version::{CURRENT_SCHEMA_VERSION, FLOOR_SCHEMA_VERSION};

/// Payload shape declared by a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Model,
    Grid,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Grid => "grid",
        }
    }
}

/// Small metadata record describing one stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-lock token, incremented once per successful save.
    #[serde(default = "initial_version")]
    pub version: u64,
    #[serde(default = "floor_schema_version")]
    pub schema_version: String,
    /// Version the document declared before its first migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_from_version: Option<String>,
    #[serde(default)]
    pub migration_warnings: Vec<String>,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn initial_version() -> u64 {
    1
}

fn floor_schema_version() -> String {
    FLOOR_SCHEMA_VERSION.to_string()
}

impl Manifest {
    /// Creates a manifest at version 1 on the current schema.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DocumentKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            version: initial_version(),
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            migrated_from_version: None,
            migration_warnings: Vec::new(),
            kind,
            extra: BTreeMap::new(),
        }
    }
}

/// Element tree, relationships and diagrams of a modeling document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPayload {
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub diagrams: Vec<Diagram>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPayload {
    Model(ModelPayload),
    Grid(GridPayload),
}

impl DocumentPayload {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Model(_) => DocumentKind::Model,
            Self::Grid(_) => DocumentKind::Grid,
        }
    }
}

/// One persisted workspace: manifest plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub manifest: Manifest,
    pub payload: DocumentPayload,
}

impl Document {
    /// Creates an empty modeling document with the requested id.
    pub fn new_model(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            manifest: Manifest::new(id, name, DocumentKind::Model),
            payload: DocumentPayload::Model(ModelPayload::default()),
        }
    }

    /// Creates an empty grid document with the requested id.
    pub fn new_grid(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            manifest: Manifest::new(id, name, DocumentKind::Grid),
            payload: DocumentPayload::Grid(GridPayload::default()),
        }
    }

    pub fn id(&self) -> &str {
        self.manifest.id.as_str()
    }

    pub fn model(&self) -> Option<&ModelPayload> {
        match &self.payload {
            DocumentPayload::Model(model) => Some(model),
            DocumentPayload::Grid(_) => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut ModelPayload> {
        match &mut self.payload {
            DocumentPayload::Model(model) => Some(model),
            DocumentPayload::Grid(_) => None,
        }
    }

    pub fn grid(&self) -> Option<&GridPayload> {
        match &self.payload {
            DocumentPayload::Grid(grid) => Some(grid),
            DocumentPayload::Model(_) => None,
        }
    }
}

/// Ownership bookkeeping stored beside, not inside, the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{DocumentKind, Manifest};
    use crate::model::version::{CURRENT_SCHEMA_VERSION, FLOOR_SCHEMA_VERSION};
    use serde_json::json;

    #[test]
    fn new_manifest_starts_at_version_one_on_current_schema() {
        let manifest = Manifest::new("demo", "Demo", DocumentKind::Model);
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(manifest.created_at, manifest.updated_at);
    }

    #[test]
    fn manifest_keeps_unknown_keys_and_defaults_missing_ones() {
        let manifest: Manifest = serde_json::from_value(json!({
            "id": "demo",
            "name": "Demo",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "theme": "dark"
        }))
        .unwrap();
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.schema_version, FLOOR_SCHEMA_VERSION);
        assert_eq!(manifest.kind, DocumentKind::Model);
        assert_eq!(manifest.extra.get("theme"), Some(&json!("dark")));

        let written = serde_json::to_value(&manifest).unwrap();
        assert_eq!(written["theme"], "dark");
        assert_eq!(written["schemaVersion"], FLOOR_SCHEMA_VERSION);
        assert!(written.get("migratedFromVersion").is_none());
    }
}

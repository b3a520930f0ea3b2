//! Untyped document form seen by the migration engine.
//!
//! Migration runs before typed parsing, so steps operate on JSON values and
//! may rewrite shapes that the current typed model would reject.

use serde_json::{Map, Value};

use crate::model::document::{Document, DocumentKind, DocumentPayload, Manifest, ModelPayload};
use crate::model::grid::GridPayload;

const MANIFEST_KEY: &str = "manifest";

/// Manifest and merged payload as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub manifest: Value,
    pub payload: Value,
}

impl RawDocument {
    pub fn new(manifest: Value, payload: Value) -> Self {
        Self { manifest, payload }
    }

    /// Splits a single-object legacy document `{manifest, ...payload}`.
    pub fn from_combined(value: Value) -> Self {
        match value {
            Value::Object(mut object) => {
                let manifest = object
                    .remove(MANIFEST_KEY)
                    .unwrap_or_else(|| Value::Object(Map::new()));
                Self::new(manifest, Value::Object(object))
            }
            other => Self::new(Value::Object(Map::new()), other),
        }
    }

    /// Serializes a typed document back into raw form.
    pub fn from_document(document: &Document) -> Result<Self, serde_json::Error> {
        let manifest = serde_json::to_value(&document.manifest)?;
        let payload = match &document.payload {
            DocumentPayload::Model(model) => serde_json::to_value(model)?,
            DocumentPayload::Grid(grid) => serde_json::to_value(grid)?,
        };
        Ok(Self::new(manifest, payload))
    }

    /// Declared `schemaVersion`, stringified if it is not a JSON string.
    pub fn declared_schema_version(&self) -> Option<String> {
        match self.manifest.get("schemaVersion")? {
            Value::Null => None,
            Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn manifest_str(&self, key: &str) -> Option<&str> {
        self.manifest.get(key).and_then(Value::as_str)
    }

    pub fn manifest_object_mut(&mut self) -> &mut Map<String, Value> {
        ensure_object(&mut self.manifest)
    }

    pub fn payload_object_mut(&mut self) -> &mut Map<String, Value> {
        ensure_object(&mut self.payload)
    }

    /// Payload shape declared by the manifest; defaults to `model`.
    pub fn declared_kind(&self) -> DocumentKind {
        match self.manifest_str("kind") {
            Some("grid") => DocumentKind::Grid,
            _ => DocumentKind::Model,
        }
    }

    /// Parses into the typed model according to the declared kind.
    pub fn into_document(self) -> Result<Document, serde_json::Error> {
        let manifest: Manifest = serde_json::from_value(self.manifest)?;
        let payload = match manifest.kind {
            DocumentKind::Model => {
                DocumentPayload::Model(serde_json::from_value::<ModelPayload>(self.payload)?)
            }
            DocumentKind::Grid => {
                DocumentPayload::Grid(serde_json::from_value::<GridPayload>(self.payload)?)
            }
        };
        Ok(Document { manifest, payload })
    }
}

/// Replaces a non-object value with an empty object and returns the map.
pub(crate) fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::RawDocument;
    use crate::model::document::{Document, DocumentKind};
    use serde_json::json;

    #[test]
    fn combined_form_splits_manifest_from_payload() {
        let raw = RawDocument::from_combined(json!({
            "manifest": {"id": "legacy", "schemaVersion": "1.0.0"},
            "elements": []
        }));
        assert_eq!(raw.manifest_str("id"), Some("legacy"));
        assert_eq!(raw.declared_schema_version().as_deref(), Some("1.0.0"));
        assert!(raw.payload.get("elements").is_some());
        assert!(raw.payload.get("manifest").is_none());
    }

    #[test]
    fn non_string_schema_version_is_stringified() {
        let raw = RawDocument::new(json!({"schemaVersion": 2}), json!({}));
        assert_eq!(raw.declared_schema_version().as_deref(), Some("2"));
        let raw = RawDocument::new(json!({"schemaVersion": null}), json!({}));
        assert_eq!(raw.declared_schema_version(), None);
    }

    #[test]
    fn typed_round_trip_keeps_kind() {
        let document = Document::new_grid("layout", "Layout");
        let raw = RawDocument::from_document(&document).unwrap();
        assert_eq!(raw.declared_kind(), DocumentKind::Grid);
        assert_eq!(raw.into_document().unwrap(), document);
    }
}

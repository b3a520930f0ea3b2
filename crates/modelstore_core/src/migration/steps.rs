//! Registered schema migration steps.
//!
//! # Invariants
//! - Steps are listed in strictly increasing `from` order.
//! - Each step's `to` equals the next step's `from`; the last `to` is the
//!   current schema version.
//! - Transforms are lenient: unexpected shapes are left alone or defaulted,
//!   never rejected. Typed validation happens after migration.

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::raw::{ensure_object, RawDocument};
use super::{MigrationStep, StepOutput};
use crate::model::version::SchemaVersion;

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        from: SchemaVersion::new(0, 0, 0),
        to: SchemaVersion::new(1, 0, 0),
        description: "normalize legacy manifest and payload layout",
        transform: normalize_legacy_layout,
    },
    MigrationStep {
        from: SchemaVersion::new(1, 0, 0),
        to: SchemaVersion::new(1, 1, 0),
        description: "coerce element stereotypes and tags into collections",
        transform: normalize_element_collections,
    },
    MigrationStep {
        from: SchemaVersion::new(1, 1, 0),
        to: SchemaVersion::new(1, 2, 0),
        description: "rename diagram type to kind and connector itemFlow to itemFlowLabel",
        transform: rename_diagram_and_connector_fields,
    },
];

/// Returns the built-in migration chain.
pub fn registered_steps() -> &'static [MigrationStep] {
    STEPS
}

fn normalize_legacy_layout(mut document: RawDocument) -> StepOutput {
    let mut warnings = Vec::new();

    let looks_like_grid = document.payload.get("layout").is_some();
    let manifest = document.manifest_object_mut();
    if !manifest.contains_key("kind") {
        let kind = if looks_like_grid { "grid" } else { "model" };
        if looks_like_grid {
            warnings.push("document kind inferred as `grid` from payload layout".to_string());
        }
        manifest.insert("kind".to_string(), Value::String(kind.to_string()));
    }
    if !manifest.contains_key("description") {
        manifest.insert("description".to_string(), Value::String(String::new()));
    }
    if !manifest.get("version").is_some_and(Value::is_u64) {
        manifest.insert("version".to_string(), json!(1));
    }
    default_timestamps(manifest, &mut warnings);

    let is_grid = manifest.get("kind").and_then(Value::as_str) == Some("grid");
    let payload = document.payload_object_mut();
    let required: &[&str] = if is_grid {
        &["elements", "constraints"]
    } else {
        &["elements", "relationships", "diagrams"]
    };
    for key in required {
        if !payload.get(*key).is_some_and(Value::is_array) {
            payload.insert((*key).to_string(), Value::Array(Vec::new()));
        }
    }

    if !is_grid {
        let mut renamed = 0usize;
        for element in objects_in(payload, "elements") {
            if !element.contains_key("metaclass") {
                if let Some(legacy) = element.remove("type") {
                    element.insert("metaclass".to_string(), legacy);
                    renamed += 1;
                }
            }
        }
        if renamed > 0 {
            warnings.push(format!(
                "renamed legacy `type` to `metaclass` on {renamed} element(s)"
            ));
        }
    }

    StepOutput { document, warnings }
}

fn default_timestamps(manifest: &mut Map<String, Value>, warnings: &mut Vec<String>) {
    let created = manifest.get("createdAt").filter(|value| value.is_string()).cloned();
    let updated = manifest.get("updatedAt").filter(|value| value.is_string()).cloned();
    let (created, updated) = match (created, updated) {
        (Some(created), Some(updated)) => (created, updated),
        (Some(created), None) => {
            warnings.push("updatedAt missing; copied from createdAt".to_string());
            (created.clone(), created)
        }
        (None, Some(updated)) => {
            warnings.push("createdAt missing; copied from updatedAt".to_string());
            (updated.clone(), updated)
        }
        (None, None) => {
            warnings.push("timestamps missing; defaulted to migration time".to_string());
            let now = Value::String(Utc::now().to_rfc3339());
            (now.clone(), now)
        }
    };
    manifest.insert("createdAt".to_string(), created);
    manifest.insert("updatedAt".to_string(), updated);
}

fn normalize_element_collections(mut document: RawDocument) -> StepOutput {
    let mut coerced_stereotypes = 0usize;
    let mut coerced_tags = 0usize;

    let payload = document.payload_object_mut();
    for element in objects_in(payload, "elements") {
        let stereotypes = element.remove("stereotypes").unwrap_or(Value::Null);
        let normalized = match stereotypes {
            Value::Array(items) => Value::Array(items),
            Value::Null => Value::Array(Vec::new()),
            Value::String(single) => {
                coerced_stereotypes += 1;
                Value::Array(
                    single
                        .split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                )
            }
            other => {
                coerced_stereotypes += 1;
                Value::Array(vec![Value::String(other.to_string())])
            }
        };
        element.insert("stereotypes".to_string(), normalized);

        let tags = element
            .entry("tags".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !tags.is_object() {
            coerced_tags += 1;
        }
        for value in ensure_object(tags).values_mut() {
            if !value.is_string() {
                let text = match &*value {
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                *value = Value::String(text);
                coerced_tags += 1;
            }
        }
    }

    let mut warnings = Vec::new();
    if coerced_stereotypes > 0 {
        warnings.push(format!(
            "coerced stereotypes into a list on {coerced_stereotypes} element(s)"
        ));
    }
    if coerced_tags > 0 {
        warnings.push(format!("coerced {coerced_tags} tag value(s) to strings"));
    }
    StepOutput { document, warnings }
}

fn rename_diagram_and_connector_fields(mut document: RawDocument) -> StepOutput {
    let mut warnings = Vec::new();
    let payload = document.payload_object_mut();

    for diagram in objects_in(payload, "diagrams") {
        if !diagram.contains_key("kind") {
            if let Some(legacy) = diagram.remove("type") {
                diagram.insert("kind".to_string(), legacy);
            }
        }
        if let Some(Value::String(kind)) = diagram.get_mut("kind") {
            let upper = kind.to_ascii_uppercase();
            *kind = upper;
        }
        if !diagram.get("viewSettings").is_some_and(Value::is_object) {
            diagram.insert(
                "viewSettings".to_string(),
                json!({"zoom": 1.0, "panX": 0.0, "panY": 0.0, "gridVisible": true}),
            );
        }
    }

    let mut renamed = 0usize;
    for relationship in objects_in(payload, "relationships") {
        let is_connector =
            relationship.get("type").and_then(Value::as_str) == Some("Connector");
        if is_connector && !relationship.contains_key("itemFlowLabel") {
            if let Some(label) = relationship.remove("itemFlow") {
                if !label.is_null() {
                    relationship.insert("itemFlowLabel".to_string(), label);
                }
                renamed += 1;
            }
        }
    }
    if renamed > 0 {
        warnings.push(format!(
            "renamed connector `itemFlow` to `itemFlowLabel` on {renamed} connector(s)"
        ));
    }

    StepOutput { document, warnings }
}

/// Mutable object entries of the array stored under `key`; non-objects are
/// skipped.
fn objects_in<'a>(
    payload: &'a mut Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    payload
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flat_map(|items| items.iter_mut())
        .filter_map(Value::as_object_mut)
}

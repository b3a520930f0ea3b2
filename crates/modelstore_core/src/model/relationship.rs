//! Typed relationships between elements.
//!
//! # Invariants
//! - Association/Generalization endpoints may be any element.
//! - Connector endpoints must be `Port` elements (checked by the validator).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::element::ElementId;

/// Stable identifier for relationships.
pub type RelationshipId = Uuid;

/// Relationship type plus the endpoint fields that type uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelationshipKind {
    Association {
        #[serde(rename = "sourceId")]
        source_id: ElementId,
        #[serde(rename = "targetId")]
        target_id: ElementId,
        #[serde(default)]
        properties: BTreeMap<String, String>,
    },
    Generalization {
        #[serde(rename = "sourceId")]
        source_id: ElementId,
        #[serde(rename = "targetId")]
        target_id: ElementId,
        #[serde(default)]
        properties: BTreeMap<String, String>,
    },
    Connector {
        #[serde(rename = "sourcePortId")]
        source_port_id: ElementId,
        #[serde(rename = "targetPortId")]
        target_port_id: ElementId,
        #[serde(
            rename = "itemFlowLabel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        item_flow_label: Option<String>,
    },
}

/// One model relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(flatten)]
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Relationship {
    pub fn association(source_id: ElementId, target_id: ElementId) -> Self {
        Self::from_kind(RelationshipKind::Association {
            source_id,
            target_id,
            properties: BTreeMap::new(),
        })
    }

    pub fn generalization(source_id: ElementId, target_id: ElementId) -> Self {
        Self::from_kind(RelationshipKind::Generalization {
            source_id,
            target_id,
            properties: BTreeMap::new(),
        })
    }

    pub fn connector(source_port_id: ElementId, target_port_id: ElementId) -> Self {
        Self::from_kind(RelationshipKind::Connector {
            source_port_id,
            target_port_id,
            item_flow_label: None,
        })
    }

    fn from_kind(kind: RelationshipKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: None,
        }
    }

    /// Returns `(source, target)` element ids regardless of relationship type.
    pub fn endpoints(&self) -> (ElementId, ElementId) {
        match &self.kind {
            RelationshipKind::Association {
                source_id,
                target_id,
                ..
            }
            | RelationshipKind::Generalization {
                source_id,
                target_id,
                ..
            } => (*source_id, *target_id),
            RelationshipKind::Connector {
                source_port_id,
                target_port_id,
                ..
            } => (*source_port_id, *target_port_id),
        }
    }

    pub fn is_connector(&self) -> bool {
        matches!(self.kind, RelationshipKind::Connector { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{Relationship, RelationshipKind};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn connector_uses_port_endpoint_keys() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let value = serde_json::to_value(Relationship::connector(a, b)).unwrap();
        assert_eq!(value["type"], "Connector");
        assert_eq!(value["sourcePortId"], json!(a));
        assert_eq!(value["targetPortId"], json!(b));
        assert!(value.get("sourceId").is_none());
    }

    #[test]
    fn association_requires_source_and_target() {
        let missing_target = serde_json::from_value::<Relationship>(json!({
            "id": Uuid::new_v4(),
            "type": "Association",
            "sourceId": Uuid::new_v4()
        }));
        assert!(missing_target.is_err());
    }

    #[test]
    fn endpoints_are_uniform_across_kinds() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let generalization = Relationship::generalization(a, b);
        assert_eq!(generalization.endpoints(), (a, b));
        assert!(!generalization.is_connector());
        assert!(matches!(
            Relationship::connector(b, a).kind,
            RelationshipKind::Connector { source_port_id, .. } if source_port_id == b
        ));
    }
}

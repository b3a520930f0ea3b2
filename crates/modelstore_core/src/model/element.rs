//! Model element records.
//!
//! # Responsibility
//! - Define the canonical element record stored in `model.json`.
//! - Keep metaclass-specific cross-references on the variant that owns them.
//!
//! # Invariants
//! - `id` is stable and never reused for another element.
//! - `owner_id` forms a tree; cycles are reported by the consistency validator.
//! - Only `Part` and `Port` carry `type_id`; only `Port` carries a signal type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for model elements.
pub type ElementId = Uuid;

/// Flow direction declared on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
    InOut,
}

impl PortDirection {
    /// Bidirectional ports never conflict with their peer.
    pub fn is_bidirectional(self) -> bool {
        matches!(self, Self::InOut)
    }
}

/// Closed metaclass tag without variant payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metaclass {
    Package,
    Block,
    Part,
    Port,
    Signal,
    Requirement,
    ValueType,
    Constraint,
}

impl Display for Metaclass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Package => "Package",
            Self::Block => "Block",
            Self::Part => "Part",
            Self::Port => "Port",
            Self::Signal => "Signal",
            Self::Requirement => "Requirement",
            Self::ValueType => "ValueType",
            Self::Constraint => "Constraint",
        };
        f.write_str(label)
    }
}

/// Metaclass plus the fields only that metaclass carries.
///
/// Serialized inline on the element with `metaclass` as the tag, matching the
/// on-disk shape `{ "metaclass": "Port", "signalTypeId": ..., ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "metaclass")]
pub enum ElementKind {
    Package,
    Block,
    Part {
        #[serde(rename = "typeId", default, skip_serializing_if = "Option::is_none")]
        type_id: Option<ElementId>,
    },
    Port {
        #[serde(rename = "typeId", default, skip_serializing_if = "Option::is_none")]
        type_id: Option<ElementId>,
        #[serde(
            rename = "signalTypeId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        signal_type_id: Option<ElementId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<PortDirection>,
    },
    Signal,
    Requirement {
        #[serde(default)]
        text: String,
    },
    ValueType,
    Constraint {
        #[serde(default)]
        expression: String,
    },
}

impl ElementKind {
    /// Returns the payload-free metaclass tag.
    pub fn metaclass(&self) -> Metaclass {
        match self {
            Self::Package => Metaclass::Package,
            Self::Block => Metaclass::Block,
            Self::Part { .. } => Metaclass::Part,
            Self::Port { .. } => Metaclass::Port,
            Self::Signal => Metaclass::Signal,
            Self::Requirement { .. } => Metaclass::Requirement,
            Self::ValueType => Metaclass::ValueType,
            Self::Constraint { .. } => Metaclass::Constraint,
        }
    }

    /// Port with every optional field unset.
    pub fn port() -> Self {
        Self::Port {
            type_id: None,
            signal_type_id: None,
            direction: None,
        }
    }
}

/// Canonical model element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(flatten)]
    pub kind: ElementKind,
    pub name: String,
    /// `None` means the element sits at the model root.
    #[serde(default)]
    pub owner_id: Option<ElementId>,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub stereotypes: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Element {
    /// Creates a root-level element with a generated id.
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, name)
    }

    /// Creates an element with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: ElementId, kind: ElementKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            name: name.into(),
            owner_id: None,
            documentation: String::new(),
            stereotypes: BTreeSet::new(),
            tags: BTreeMap::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Sets the owning element.
    pub fn owned_by(mut self, owner_id: ElementId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn metaclass(&self) -> Metaclass {
        self.kind.metaclass()
    }

    /// Classifier reference for parts and ports.
    pub fn type_id(&self) -> Option<ElementId> {
        match &self.kind {
            ElementKind::Part { type_id } | ElementKind::Port { type_id, .. } => *type_id,
            _ => None,
        }
    }

    /// Signal reference, only ever set on ports.
    pub fn signal_type_id(&self) -> Option<ElementId> {
        match &self.kind {
            ElementKind::Port { signal_type_id, .. } => *signal_type_id,
            _ => None,
        }
    }

    pub fn port_direction(&self) -> Option<PortDirection> {
        match &self.kind {
            ElementKind::Port { direction, .. } => *direction,
            _ => None,
        }
    }
}

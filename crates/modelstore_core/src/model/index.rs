//! Id-indexed lookup over a model payload.
//!
//! Relations between entities are plain id fields; this index resolves them
//! without building an object graph.

use std::collections::HashMap;

use super::document::ModelPayload;
use super::element::{Element, ElementId};
use super::relationship::{Relationship, RelationshipId};

/// Borrowed arena view of one model payload.
pub struct ModelIndex<'a> {
    elements: HashMap<ElementId, &'a Element>,
    relationships: HashMap<RelationshipId, &'a Relationship>,
}

impl<'a> ModelIndex<'a> {
    /// Indexes elements and relationships by id. Later duplicates win.
    pub fn build(model: &'a ModelPayload) -> Self {
        let elements = model
            .elements
            .iter()
            .map(|element| (element.id, element))
            .collect();
        let relationships = model
            .relationships
            .iter()
            .map(|relationship| (relationship.id, relationship))
            .collect();
        Self {
            elements,
            relationships,
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&'a Element> {
        self.elements.get(&id).copied()
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&'a Relationship> {
        self.relationships.get(&id).copied()
    }

    pub fn contains_element(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }
}

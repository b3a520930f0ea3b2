//! Per-shape schema validation applied before any store write.
//!
//! # Responsibility
//! - Reject structurally malformed documents (bad ids, duplicate entity ids,
//!   impossible geometry) before create/save/bootstrap touch the disk.
//!
//! # Invariants
//! - Validation is pure and never mutates the document.
//! - Referential and semantic checks live in `validate::consistency`; this
//!   module only checks shape.

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use super::diagram::{Diagram, DiagramKind};
use super::document::{Document, DocumentKind, DocumentPayload, ModelPayload};
use super::grid::GridPayload;
use super::version::SchemaVersion;
use crate::store::ids::is_valid_document_id;

/// Shape validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentValidationError {
    InvalidId(String),
    BlankName,
    InvalidVersion(u64),
    InvalidSchemaVersion(String),
    /// Writes must target the schema version this build produces.
    SchemaVersionMismatch {
        declared: String,
        expected: String,
    },
    KindMismatch {
        declared: DocumentKind,
        payload: DocumentKind,
    },
    DuplicateId {
        entity: &'static str,
        id: String,
    },
    ContextBlockOutsideIbd(String),
    InvalidGeometry(String),
    InvalidPortPlacement(String),
    InvalidLayout,
    ElementOutOfBounds(String),
    EmptyConstraint(String),
    UnknownConstraintTarget {
        constraint_id: String,
        element_id: String,
    },
}

impl Display for DocumentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(id) => write!(
                f,
                "document id is invalid: `{id}` (expected [A-Za-z0-9_-]{{1,80}})"
            ),
            Self::BlankName => write!(f, "document name must not be blank"),
            Self::InvalidVersion(version) => {
                write!(f, "document version must be positive, got {version}")
            }
            Self::InvalidSchemaVersion(value) => write!(
                f,
                "schema version is invalid: `{value}` (expected major.minor.patch)"
            ),
            Self::SchemaVersionMismatch { declared, expected } => write!(
                f,
                "document declares schema {declared}; writes require {expected}"
            ),
            Self::KindMismatch { declared, payload } => write!(
                f,
                "manifest declares `{}` but payload is `{}`",
                declared.as_str(),
                payload.as_str()
            ),
            Self::DuplicateId { entity, id } => write!(f, "duplicate {entity} id: {id}"),
            Self::ContextBlockOutsideIbd(id) => {
                write!(f, "only IBD diagrams may declare a context block: {id}")
            }
            Self::InvalidGeometry(id) => write!(f, "node geometry is invalid: {id}"),
            Self::InvalidPortPlacement(id) => {
                write!(f, "port placement offset must be within 0..=1: {id}")
            }
            Self::InvalidLayout => write!(f, "grid layout needs positive rows, columns and cell size"),
            Self::ElementOutOfBounds(id) => write!(f, "grid element exceeds layout: {id}"),
            Self::EmptyConstraint(id) => write!(f, "grid constraint has no elements: {id}"),
            Self::UnknownConstraintTarget {
                constraint_id,
                element_id,
            } => write!(
                f,
                "grid constraint {constraint_id} references unknown element {element_id}"
            ),
        }
    }
}

impl Error for DocumentValidationError {}

/// Schema validator consulted by every store write path.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, document: &Document) -> Result<(), DocumentValidationError>;
}

/// Default validator covering both payload shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeValidator;

impl SchemaValidator for ShapeValidator {
    fn validate(&self, document: &Document) -> Result<(), DocumentValidationError> {
        validate_manifest(document)?;
        match &document.payload {
            DocumentPayload::Model(model) => validate_model(model),
            DocumentPayload::Grid(grid) => validate_grid(grid),
        }
    }
}

fn validate_manifest(document: &Document) -> Result<(), DocumentValidationError> {
    let manifest = &document.manifest;
    if !is_valid_document_id(manifest.id.as_str()) {
        return Err(DocumentValidationError::InvalidId(manifest.id.clone()));
    }
    if manifest.name.trim().is_empty() {
        return Err(DocumentValidationError::BlankName);
    }
    if manifest.version == 0 {
        return Err(DocumentValidationError::InvalidVersion(manifest.version));
    }
    if manifest.schema_version.parse::<SchemaVersion>().is_err() {
        return Err(DocumentValidationError::InvalidSchemaVersion(
            manifest.schema_version.clone(),
        ));
    }
    let payload = document.payload.kind();
    if manifest.kind != payload {
        return Err(DocumentValidationError::KindMismatch {
            declared: manifest.kind,
            payload,
        });
    }
    Ok(())
}

fn validate_model(model: &ModelPayload) -> Result<(), DocumentValidationError> {
    ensure_unique("element", model.elements.iter().map(|element| element.id))?;
    ensure_unique(
        "relationship",
        model.relationships.iter().map(|relationship| relationship.id),
    )?;
    ensure_unique("diagram", model.diagrams.iter().map(|diagram| diagram.id))?;
    for diagram in &model.diagrams {
        validate_diagram(diagram)?;
    }
    Ok(())
}

fn validate_diagram(diagram: &Diagram) -> Result<(), DocumentValidationError> {
    if diagram.kind != DiagramKind::Ibd && diagram.context_block_id.is_some() {
        return Err(DocumentValidationError::ContextBlockOutsideIbd(
            diagram.id.to_string(),
        ));
    }
    ensure_unique("diagram node", diagram.nodes.iter().map(|node| node.id))?;
    ensure_unique("diagram edge", diagram.edges.iter().map(|edge| edge.id))?;

    for node in &diagram.nodes {
        let bounds = node.bounds;
        let finite = [bounds.x, bounds.y, bounds.width, bounds.height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || bounds.width < 0.0 || bounds.height < 0.0 {
            return Err(DocumentValidationError::InvalidGeometry(node.id.to_string()));
        }
        if let Some(placement) = node.port_placement {
            if !(0.0..=1.0).contains(&placement.offset) {
                return Err(DocumentValidationError::InvalidPortPlacement(
                    node.id.to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_grid(grid: &GridPayload) -> Result<(), DocumentValidationError> {
    let layout = &grid.layout;
    if layout.columns == 0
        || layout.rows == 0
        || !layout.cell_size.is_finite()
        || layout.cell_size <= 0.0
    {
        return Err(DocumentValidationError::InvalidLayout);
    }

    ensure_unique("grid element", grid.elements.iter().map(|element| element.id))?;
    ensure_unique(
        "grid constraint",
        grid.constraints.iter().map(|constraint| constraint.id),
    )?;

    for element in &grid.elements {
        if !element.fits(layout) {
            return Err(DocumentValidationError::ElementOutOfBounds(
                element.id.to_string(),
            ));
        }
    }

    let known: HashSet<_> = grid.elements.iter().map(|element| element.id).collect();
    for constraint in &grid.constraints {
        if constraint.element_ids.is_empty() {
            return Err(DocumentValidationError::EmptyConstraint(
                constraint.id.to_string(),
            ));
        }
        if let Some(missing) = constraint
            .element_ids
            .iter()
            .find(|element_id| !known.contains(element_id))
        {
            return Err(DocumentValidationError::UnknownConstraintTarget {
                constraint_id: constraint.id.to_string(),
                element_id: missing.to_string(),
            });
        }
    }
    Ok(())
}

fn ensure_unique<T>(
    entity: &'static str,
    ids: impl Iterator<Item = T>,
) -> Result<(), DocumentValidationError>
where
    T: Eq + Hash + Display,
{
    let mut seen = HashSet::new();
    for id in ids {
        if seen.contains(&id) {
            return Err(DocumentValidationError::DuplicateId {
                entity,
                id: id.to_string(),
            });
        }
        seen.insert(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DocumentValidationError, SchemaValidator, ShapeValidator};
    use crate::model::diagram::{Diagram, DiagramKind, DiagramNode, NodeKind};
    use crate::model::document::{Document, DocumentKind, DocumentPayload, ModelPayload};
    use crate::model::element::{Element, ElementKind};
    use crate::model::grid::{GridConstraint, GridConstraintKind, GridElement};
    use uuid::Uuid;

    fn model_doc() -> Document {
        Document::new_model("demo", "Demo")
    }

    #[test]
    fn accepts_empty_documents_of_both_shapes() {
        assert!(ShapeValidator.validate(&model_doc()).is_ok());
        assert!(ShapeValidator
            .validate(&Document::new_grid("layout", "Layout"))
            .is_ok());
    }

    #[test]
    fn rejects_unsafe_id_and_blank_name() {
        let mut doc = model_doc();
        doc.manifest.id = "bad id".to_string();
        assert!(matches!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::InvalidId(_))
        ));

        let mut doc = model_doc();
        doc.manifest.name = "   ".to_string();
        assert_eq!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::BlankName)
        );
    }

    #[test]
    fn rejects_kind_mismatch() {
        let mut doc = model_doc();
        doc.manifest.kind = DocumentKind::Grid;
        assert_eq!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::KindMismatch {
                declared: DocumentKind::Grid,
                payload: DocumentKind::Model,
            })
        );
    }

    #[test]
    fn rejects_duplicate_element_ids() {
        let element = Element::new(ElementKind::Block, "B");
        let doc = Document {
            payload: DocumentPayload::Model(ModelPayload {
                elements: vec![element.clone(), element.clone()],
                ..ModelPayload::default()
            }),
            ..model_doc()
        };
        assert_eq!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::DuplicateId {
                entity: "element",
                id: element.id.to_string(),
            })
        );
    }

    #[test]
    fn rejects_context_block_on_bdd_and_negative_geometry() {
        let owner = Uuid::new_v4();
        let mut diagram = Diagram::new("bdd", DiagramKind::Bdd, owner);
        diagram.context_block_id = Some(owner);
        let mut doc = model_doc();
        doc.model_mut().unwrap().diagrams.push(diagram);
        assert!(matches!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::ContextBlockOutsideIbd(_))
        ));

        let mut diagram = Diagram::new("ibd", DiagramKind::Ibd, owner);
        let mut node = DiagramNode::new(owner, NodeKind::Block);
        node.bounds.width = -1.0;
        diagram.nodes.push(node);
        let mut doc = model_doc();
        doc.model_mut().unwrap().diagrams.push(diagram);
        assert!(matches!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn grid_rejects_out_of_bounds_and_dangling_constraints() {
        let mut doc = Document::new_grid("layout", "Layout");
        if let DocumentPayload::Grid(grid) = &mut doc.payload {
            grid.elements.push(GridElement::new("far", 40, 0));
        }
        assert!(matches!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::ElementOutOfBounds(_))
        ));

        let mut doc = Document::new_grid("layout", "Layout");
        if let DocumentPayload::Grid(grid) = &mut doc.payload {
            grid.elements.push(GridElement::new("a", 0, 0));
            grid.constraints.push(GridConstraint {
                id: Uuid::new_v4(),
                kind: GridConstraintKind::Adjacent,
                element_ids: vec![Uuid::new_v4()],
            });
        }
        assert!(matches!(
            ShapeValidator.validate(&doc),
            Err(DocumentValidationError::UnknownConstraintTarget { .. })
        ));
    }
}

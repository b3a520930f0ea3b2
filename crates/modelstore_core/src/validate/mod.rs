//! Model consistency checks.
//!
//! # Responsibility
//! - Turn a document into an ordered list of consistency issues.
//! - Leave policy (block or allow a save) to callers.
//!
//! # Invariants
//! - Checks are pure and run in a fixed order on every pass.
//! - Issues are data; this module never returns an error.

mod consistency;

use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::model::diagram::{DiagramId, EdgeId, NodeId};
use crate::model::element::ElementId;
use crate::model::relationship::RelationshipId;

pub use consistency::validate_document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Stable issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    DuplicateName,
    ConnectorPortMissing,
    ConnectorTargetInvalid,
    PortSignalMismatch,
    PortDirectionConflict,
    RequirementUntraced,
    DiagramNodeMissing,
    DiagramNodeMismatch,
    DiagramEdgeMissing,
    DiagramEdgeMismatch,
    OwnerMissing,
    OwnershipCycle,
    TypeReferenceMissing,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateName => "duplicate-name",
            Self::ConnectorPortMissing => "connector-port-missing",
            Self::ConnectorTargetInvalid => "connector-target-invalid",
            Self::PortSignalMismatch => "port-signal-mismatch",
            Self::PortDirectionConflict => "port-direction-conflict",
            Self::RequirementUntraced => "requirement-untraced",
            Self::DiagramNodeMissing => "diagram-node-missing",
            Self::DiagramNodeMismatch => "diagram-node-mismatch",
            Self::DiagramEdgeMissing => "diagram-edge-missing",
            Self::DiagramEdgeMismatch => "diagram-edge-mismatch",
            Self::OwnerMissing => "owner-missing",
            Self::OwnershipCycle => "ownership-cycle",
            Self::TypeReferenceMissing => "type-reference-missing",
        }
    }

    /// Severity assigned to every issue with this code.
    pub fn severity(self) -> Severity {
        match self {
            Self::PortDirectionConflict | Self::RequirementUntraced => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl Display for IssueCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One consistency finding plus whichever entity ids it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<ElementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_id: Option<RelationshipId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_id: Option<DiagramId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<EdgeId>,
}

impl Issue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            element_id: None,
            relationship_id: None,
            diagram_id: None,
            node_id: None,
            edge_id: None,
        }
    }

    pub fn element(mut self, id: ElementId) -> Self {
        self.element_id = Some(id);
        self
    }

    pub fn relationship(mut self, id: RelationshipId) -> Self {
        self.relationship_id = Some(id);
        self
    }

    pub fn diagram(mut self, id: DiagramId) -> Self {
        self.diagram_id = Some(id);
        self
    }

    pub fn node(mut self, id: NodeId) -> Self {
        self.node_id = Some(id);
        self
    }

    pub fn edge(mut self, id: EdgeId) -> Self {
        self.edge_id = Some(id);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Whether any issue has error severity.
pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(Issue::is_error)
}

#[cfg(test)]
mod tests {
    use super::{has_errors, Issue, IssueCode, Severity};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn issue_serializes_code_in_kebab_case_and_skips_absent_ids() {
        let element_id = Uuid::new_v4();
        let issue = Issue::new(IssueCode::PortSignalMismatch, "mismatch").element(element_id);
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["code"], "port-signal-mismatch");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["elementId"], json!(element_id.to_string()));
        assert!(value.get("edgeId").is_none());
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let issues = vec![Issue::new(IssueCode::RequirementUntraced, "untraced")];
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(!has_errors(&issues));
    }
}

//! Consistency checks over a model payload.

use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use super::{Issue, IssueCode};
use crate::model::diagram::Diagram;
use crate::model::document::{Document, ModelPayload};
use crate::model::element::{Element, ElementId, Metaclass};
use crate::model::index::ModelIndex;
use crate::model::relationship::{Relationship, RelationshipKind};

/// Runs every consistency check over `document`. Grid documents yield no
/// issues.
pub fn validate_document(document: &Document) -> Vec<Issue> {
    let Some(model) = document.model() else {
        return Vec::new();
    };
    let started_at = Instant::now();
    let index = ModelIndex::build(model);

    let mut issues = Vec::new();
    check_duplicate_names(model, &mut issues);
    check_connectors(model, &index, &mut issues);
    check_requirement_traceability(model, &mut issues);
    for diagram in &model.diagrams {
        check_diagram(diagram, &index, &mut issues);
    }
    check_ownership(model, &index, &mut issues);
    check_type_references(model, &index, &mut issues);

    debug!(
        "event=doc_validate module=validate status=ok id={} issues={} duration_ms={}",
        document.id(),
        issues.len(),
        started_at.elapsed().as_millis()
    );
    issues
}

fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn check_duplicate_names(model: &ModelPayload, issues: &mut Vec<Issue>) {
    let mut groups: BTreeMap<(Option<ElementId>, String), usize> = BTreeMap::new();
    for element in &model.elements {
        *groups
            .entry((element.owner_id, normalized_name(&element.name)))
            .or_default() += 1;
    }

    for element in &model.elements {
        let key = (element.owner_id, normalized_name(&element.name));
        if groups.get(&key).copied().unwrap_or(0) > 1 {
            issues.push(
                Issue::new(
                    IssueCode::DuplicateName,
                    format!(
                        "{} `{}` shares its name with a sibling",
                        element.metaclass(),
                        element.name.trim()
                    ),
                )
                .element(element.id),
            );
        }
    }
}

fn check_connectors(model: &ModelPayload, index: &ModelIndex<'_>, issues: &mut Vec<Issue>) {
    for relationship in &model.relationships {
        let RelationshipKind::Connector {
            source_port_id,
            target_port_id,
            ..
        } = &relationship.kind
        else {
            continue;
        };

        let mut ports = Vec::with_capacity(2);
        for (end, element_id) in [("source", *source_port_id), ("target", *target_port_id)] {
            match index.element(element_id) {
                None => issues.push(
                    Issue::new(
                        IssueCode::ConnectorPortMissing,
                        format!("connector {end} {element_id} does not exist"),
                    )
                    .relationship(relationship.id)
                    .element(element_id),
                ),
                Some(element) if element.metaclass() != Metaclass::Port => issues.push(
                    Issue::new(
                        IssueCode::ConnectorTargetInvalid,
                        format!(
                            "connector {end} `{}` is a {}, not a Port",
                            element.name,
                            element.metaclass()
                        ),
                    )
                    .relationship(relationship.id)
                    .element(element_id),
                ),
                Some(element) => ports.push(element),
            }
        }

        if let [source, target] = ports.as_slice() {
            check_port_pair(relationship, source, target, issues);
        }
    }
}

fn check_port_pair(
    relationship: &Relationship,
    source: &Element,
    target: &Element,
    issues: &mut Vec<Issue>,
) {
    if let (Some(source_signal), Some(target_signal)) =
        (source.signal_type_id(), target.signal_type_id())
    {
        if source_signal != target_signal {
            issues.push(
                Issue::new(
                    IssueCode::PortSignalMismatch,
                    format!(
                        "ports `{}` and `{}` carry different signal types",
                        source.name, target.name
                    ),
                )
                .relationship(relationship.id),
            );
        }
    }

    if let (Some(source_direction), Some(target_direction)) =
        (source.port_direction(), target.port_direction())
    {
        let both_directed =
            !source_direction.is_bidirectional() && !target_direction.is_bidirectional();
        if both_directed && source_direction == target_direction {
            issues.push(
                Issue::new(
                    IssueCode::PortDirectionConflict,
                    format!(
                        "ports `{}` and `{}` both flow in the same direction",
                        source.name, target.name
                    ),
                )
                .relationship(relationship.id),
            );
        }
    }
}

fn check_requirement_traceability(model: &ModelPayload, issues: &mut Vec<Issue>) {
    let requirements: Vec<&Element> = model
        .elements
        .iter()
        .filter(|element| element.metaclass() == Metaclass::Requirement)
        .collect();
    if requirements.is_empty() {
        return;
    }

    // Any non-connector relationship counts as a trace, whatever its type.
    let traced: HashSet<ElementId> = model
        .relationships
        .iter()
        .filter(|relationship| !relationship.is_connector())
        .flat_map(|relationship| {
            let (source, target) = relationship.endpoints();
            [source, target]
        })
        .collect();

    for requirement in requirements {
        if !traced.contains(&requirement.id) {
            issues.push(
                Issue::new(
                    IssueCode::RequirementUntraced,
                    format!("requirement `{}` has no trace relationship", requirement.name),
                )
                .element(requirement.id),
            );
        }
    }
}

fn check_diagram(diagram: &Diagram, index: &ModelIndex<'_>, issues: &mut Vec<Issue>) {
    for node in &diagram.nodes {
        match index.element(node.element_id) {
            None => issues.push(
                Issue::new(
                    IssueCode::DiagramNodeMissing,
                    format!(
                        "node in `{}` references missing element {}",
                        diagram.name, node.element_id
                    ),
                )
                .diagram(diagram.id)
                .node(node.id)
                .element(node.element_id),
            ),
            Some(element) => {
                if let Some(required) = node.kind.required_metaclass() {
                    if element.metaclass() != required {
                        issues.push(
                            Issue::new(
                                IssueCode::DiagramNodeMismatch,
                                format!(
                                    "{required} node in `{}` shows {} `{}`",
                                    diagram.name,
                                    element.metaclass(),
                                    element.name
                                ),
                            )
                            .diagram(diagram.id)
                            .node(node.id)
                            .element(element.id),
                        );
                    }
                }
            }
        }
    }

    for edge in &diagram.edges {
        let Some(relationship) = index.relationship(edge.relationship_id) else {
            issues.push(
                Issue::new(
                    IssueCode::DiagramEdgeMissing,
                    format!(
                        "edge in `{}` references missing relationship {}",
                        diagram.name, edge.relationship_id
                    ),
                )
                .diagram(diagram.id)
                .edge(edge.id)
                .relationship(edge.relationship_id),
            );
            continue;
        };

        let mismatch = match (diagram.node(edge.source_node_id), diagram.node(edge.target_node_id))
        {
            (Some(source), Some(target)) => {
                let (expected_source, expected_target) = relationship.endpoints();
                (source.element_id != expected_source || target.element_id != expected_target)
                    .then(|| "edge endpoints do not match its relationship".to_string())
            }
            _ => Some(format!(
                "edge endpoints are not nodes of diagram `{}`",
                diagram.name
            )),
        };
        if let Some(message) = mismatch {
            issues.push(
                Issue::new(IssueCode::DiagramEdgeMismatch, message)
                    .diagram(diagram.id)
                    .edge(edge.id)
                    .relationship(relationship.id),
            );
        }
    }
}

fn check_ownership(model: &ModelPayload, index: &ModelIndex<'_>, issues: &mut Vec<Issue>) {
    for element in &model.elements {
        let Some(owner_id) = element.owner_id else {
            continue;
        };
        if !index.contains_element(owner_id) {
            issues.push(
                Issue::new(
                    IssueCode::OwnerMissing,
                    format!("`{}` is owned by missing element {owner_id}", element.name),
                )
                .element(element.id),
            );
        } else if on_ownership_cycle(element, index) {
            issues.push(
                Issue::new(
                    IssueCode::OwnershipCycle,
                    format!("`{}` is part of an ownership cycle", element.name),
                )
                .element(element.id),
            );
        }
    }
}

/// Follows owner links from `start`; true if they lead back to `start`.
fn on_ownership_cycle(start: &Element, index: &ModelIndex<'_>) -> bool {
    let mut seen = HashSet::new();
    let mut cursor = start.owner_id;
    while let Some(id) = cursor {
        if id == start.id {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        cursor = index.element(id).and_then(|owner| owner.owner_id);
    }
    false
}

fn check_type_references(model: &ModelPayload, index: &ModelIndex<'_>, issues: &mut Vec<Issue>) {
    for element in &model.elements {
        let references = [
            ("type", element.type_id()),
            ("signal type", element.signal_type_id()),
        ];
        for (label, reference) in references {
            let Some(reference) = reference else {
                continue;
            };
            if !index.contains_element(reference) {
                issues.push(
                    Issue::new(
                        IssueCode::TypeReferenceMissing,
                        format!(
                            "`{}` references missing {label} element {reference}",
                            element.name
                        ),
                    )
                    .element(element.id),
                );
            }
        }
    }
}

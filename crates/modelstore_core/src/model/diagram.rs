//! Diagram views over the model.
//!
//! Diagrams never own model data: nodes point at elements and edges point at
//! relationships by id only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::element::{ElementId, Metaclass};
use super::relationship::RelationshipId;

pub type DiagramId = Uuid;
pub type NodeId = Uuid;
pub type EdgeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiagramKind {
    /// Block definition diagram.
    Bdd,
    /// Internal block diagram.
    Ibd,
}

/// Visual shape a node renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Package,
    Block,
    Part,
    Port,
    Signal,
    Requirement,
    ValueType,
    Constraint,
}

impl NodeKind {
    /// Metaclass a node of this kind is required to reference, if strict.
    ///
    /// Only port and part nodes are strict; other shapes may render any
    /// element.
    pub fn required_metaclass(self) -> Option<Metaclass> {
        match self {
            Self::Port => Some(Metaclass::Port),
            Self::Part => Some(Metaclass::Part),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 160.0,
            height: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Where a port node sits on its parent's border.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortPlacement {
    pub side: PortSide,
    /// Fraction along the side, `0.0..=1.0`.
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramNode {
    pub id: NodeId,
    pub element_id: ElementId,
    pub kind: NodeKind,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_placement: Option<PortPlacement>,
}

impl DiagramNode {
    pub fn new(element_id: ElementId, kind: NodeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            element_id,
            kind,
            bounds: Bounds::default(),
            port_placement: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: EdgeId,
    pub relationship_id: RelationshipId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub routing_points: Vec<Point>,
}

impl DiagramEdge {
    pub fn new(relationship_id: RelationshipId, source_node_id: NodeId, target_node_id: NodeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            relationship_id,
            source_node_id,
            target_node_id,
            routing_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub grid_visible: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            grid_visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub id: DiagramId,
    pub name: String,
    pub kind: DiagramKind,
    pub owner_id: ElementId,
    /// Enclosing block for internal block diagrams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_block_id: Option<ElementId>,
    #[serde(default)]
    pub nodes: Vec<DiagramNode>,
    #[serde(default)]
    pub edges: Vec<DiagramEdge>,
    #[serde(default)]
    pub view_settings: ViewSettings,
}

impl Diagram {
    pub fn new(name: impl Into<String>, kind: DiagramKind, owner_id: ElementId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            owner_id,
            context_block_id: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            view_settings: ViewSettings::default(),
        }
    }

    pub fn node(&self, node_id: NodeId) -> Option<&DiagramNode> {
        self.nodes.iter().find(|node| node.id == node_id)
    }
}

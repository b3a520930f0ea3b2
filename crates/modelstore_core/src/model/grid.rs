//! Grid layout payload.
//!
//! The grid variant shares manifest handling with the modeling variant but
//! carries a flat cell layout instead of an element tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type GridElementId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
}

fn default_cell_size() -> f64 {
    24.0
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 12,
            rows: 12,
            cell_size: default_cell_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridElement {
    pub id: GridElementId,
    pub label: String,
    #[serde(default)]
    pub kind: String,
    pub column: u32,
    pub row: u32,
    #[serde(default = "default_span")]
    pub column_span: u32,
    #[serde(default = "default_span")]
    pub row_span: u32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_span() -> u32 {
    1
}

impl GridElement {
    pub fn new(label: impl Into<String>, column: u32, row: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            kind: String::new(),
            column,
            row,
            column_span: 1,
            row_span: 1,
            properties: BTreeMap::new(),
        }
    }

    /// Whether the element's full span fits inside `layout`.
    pub fn fits(&self, layout: &GridLayout) -> bool {
        self.column_span > 0
            && self.row_span > 0
            && u64::from(self.column) + u64::from(self.column_span) <= u64::from(layout.columns)
            && u64::from(self.row) + u64::from(self.row_span) <= u64::from(layout.rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridConstraintKind {
    AlignRow,
    AlignColumn,
    Adjacent,
    Pinned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConstraint {
    pub id: Uuid,
    pub kind: GridConstraintKind,
    pub element_ids: Vec<GridElementId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPayload {
    #[serde(default)]
    pub layout: GridLayout,
    #[serde(default)]
    pub elements: Vec<GridElement>,
    #[serde(default)]
    pub constraints: Vec<GridConstraint>,
}

#[cfg(test)]
mod tests {
    use super::{GridElement, GridLayout};

    #[test]
    fn fits_checks_span_against_layout_edges() {
        let layout = GridLayout {
            columns: 4,
            rows: 2,
            cell_size: 10.0,
        };
        let mut element = GridElement::new("a", 3, 1);
        assert!(element.fits(&layout));
        element.column_span = 2;
        assert!(!element.fits(&layout));
        element.column_span = 0;
        assert!(!element.fits(&layout));
    }
}

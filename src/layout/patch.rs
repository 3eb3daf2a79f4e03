//! Records sent to the layout solver.

use crate::view::LayoutStyle;
use serde::{Deserialize, Serialize};

/// Registers or restyles one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub layout_id: i32,
    /// `None` for the root of a layout tree.
    pub parent_layout_id: Option<i32>,
    pub style: LayoutStyle,
    pub name: String,
    /// If true the solver asks the host to measure this node's content.
    pub needs_measure: bool,
}

/// The complete, ordered child list of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutParentChildren {
    pub parent_layout_id: i32,
    pub child_layout_ids: Vec<i32>,
}

/// One batch of changes for a single root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutNodeList {
    pub layout_nodes: Vec<LayoutNode>,
    pub parent_children: Vec<LayoutParentChildren>,
}

impl LayoutNodeList {
    pub fn is_empty(&self) -> bool {
        self.layout_nodes.is_empty() && self.parent_children.is_empty()
    }
}

//! Keeping an external layout solver in sync with resolved trees.

mod bridge;
mod id;
mod patch;
mod taffy_solver;

pub use bridge::{update_derived_layout, LayoutBridge};
pub use id::{LayoutIdAllocator, LayoutKey};
pub use patch::{LayoutNode, LayoutNodeList, LayoutParentChildren};
pub use taffy_solver::{taffy_style, MeasureFn, TaffySolver};

use crate::error::Error;
use crate::rect::ComputedLayout;
use std::collections::HashMap;

/// A layout solver that keeps its own node tree keyed by layout id.
pub trait LayoutSolver {
    /// Drops a node. Unknown ids are ignored.
    fn remove_node(&mut self, layout_id: i32);

    /// Applies a batch of node and child-list updates, recomputes layout from `root_layout_id`
    /// and returns the rects of nodes whose layout changed.
    fn submit(
        &mut self,
        root_layout_id: i32,
        batch: LayoutNodeList,
    ) -> Result<HashMap<i32, ComputedLayout>, Error>;
}

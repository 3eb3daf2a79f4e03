use super::{LayoutNode, LayoutNodeList, LayoutParentChildren, LayoutSolver};
use crate::error::Error;
use crate::rect::ComputedLayout;
use crate::resolved::{LayoutSource, NodeIndex, ResolvedTree};
use crate::view::content_hash;
use log::{trace, warn};
use std::collections::{HashMap, HashSet};

/// Feeds resolved trees to a layout solver incrementally and writes the results back.
///
/// Only nodes whose layout style or text changed since the last pass are re-sent, and a child list
/// is only re-sent when the set or order of children changed.
#[derive(Debug)]
pub struct LayoutBridge<S> {
    solver: S,
    /// layout id -> hash of what was last sent for it
    style_cache: HashMap<i32, u64>,
    children_cache: HashMap<i32, Vec<i32>>,
    layout_cache: HashMap<i32, ComputedLayout>,
}

impl<S: LayoutSolver> LayoutBridge<S> {
    pub fn new(solver: S) -> LayoutBridge<S> {
        LayoutBridge {
            solver,
            style_cache: HashMap::new(),
            children_cache: HashMap::new(),
            layout_cache: HashMap::new(),
        }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Last known layout for an id.
    pub fn layout(&self, layout_id: i32) -> Option<&ComputedLayout> {
        self.layout_cache.get(&layout_id)
    }

    /// Collects changes under `root` into `batch`. Returns true if anything changed.
    pub fn update_layout_tree(
        &mut self,
        tree: &ResolvedTree,
        root: NodeIndex,
        batch: &mut LayoutNodeList,
    ) -> bool {
        self.update_node(tree, root, None, batch)
    }

    fn update_node(
        &mut self,
        tree: &ResolvedTree,
        node: NodeIndex,
        parent_layout_id: Option<i32>,
        batch: &mut LayoutNodeList,
    ) -> bool {
        let n = &tree[node];
        let id = n.layout_id;
        let key = content_hash(&(&n.style.layout, &n.text_info));

        let mut changed = false;
        if self.style_cache.get(&id) != Some(&key) {
            batch.layout_nodes.push(LayoutNode {
                layout_id: id,
                parent_layout_id,
                style: n.style.layout.clone(),
                name: n.name().to_string(),
                needs_measure: n.text_info.is_some(),
            });
            self.style_cache.insert(id, key);
            changed = true;
        }

        let mut child_ids = Vec::new();
        for child in tree.children(node) {
            changed |= self.update_node(tree, child, Some(id), batch);
            child_ids.push(tree[child].layout_id);
        }

        let children_changed = match self.children_cache.get(&id) {
            Some(previous) => previous != &child_ids,
            None => !child_ids.is_empty(),
        };
        if children_changed {
            batch.parent_children.push(LayoutParentChildren {
                parent_layout_id: id,
                child_layout_ids: child_ids.clone(),
            });
            self.children_cache.insert(id, child_ids);
            changed = true;
        }

        changed
    }

    /// Runs one layout pass.
    ///
    /// Removes stale ids from the solver, sends whatever changed, and copies the resulting rects
    /// into every node of `tree`. A node the solver has no rect for keeps no layout; it's logged
    /// and skipped for this frame.
    pub fn layout_tree(
        &mut self,
        tree: &mut ResolvedTree,
        removal: &HashSet<i32>,
    ) -> Result<bool, Error> {
        for &id in removal {
            self.solver.remove_node(id);
            self.style_cache.remove(&id);
            self.children_cache.remove(&id);
            self.layout_cache.remove(&id);
        }

        let mut changed = !removal.is_empty();
        let roots: Vec<_> = tree.roots().collect();
        for root in roots {
            let mut batch = LayoutNodeList::default();
            let root_changed = self.update_layout_tree(tree, root, &mut batch);
            if root_changed || !removal.is_empty() {
                trace!(
                    "layout pass: {} nodes, {} child lists",
                    batch.layout_nodes.len(),
                    batch.parent_children.len()
                );
                let layouts = self.solver.submit(tree[root].layout_id, batch)?;
                self.layout_cache.extend(layouts);
            }
            changed |= root_changed;
        }

        let nodes: Vec<_> = tree.iter().collect();
        for node in nodes {
            let n = &mut tree[node];
            match self.layout_cache.get(&n.layout_id) {
                Some(layout) => {
                    let mut layout = *layout;
                    if n.override_layout_size {
                        if let Some(current) = &n.computed_layout {
                            layout.width = current.width;
                            layout.height = current.height;
                        }
                    }
                    n.computed_layout = Some(layout);
                }
                None => warn!(
                    "no layout computed for {} (layout id {})",
                    n.name(),
                    n.layout_id
                ),
            }
        }

        Ok(changed)
    }
}

/// Fills in layouts of a merged tree from the trees it was built from.
///
/// Nodes driven by a size animation are left alone; the animation writes their layout.
pub fn update_derived_layout(
    merged: &mut ResolvedTree,
    from: &ResolvedTree,
    to: &ResolvedTree,
) {
    let nodes: Vec<_> = merged.iter().collect();
    for node in nodes {
        let n = &mut merged[node];
        if n.override_layout_size {
            continue;
        }
        n.computed_layout = match n.layout_source {
            Some(LayoutSource::From(src)) => from[src].computed_layout,
            Some(LayoutSource::To(src)) => to[src].computed_layout,
            None => n.computed_layout,
        };
    }
}

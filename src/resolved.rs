//! The resolved node tree handed to layout and rendering.
//!
//! Nodes live in an arena owned by the tree and link to each other by index: `first_child` and
//! `next_sibling` form the structure, `parent` is only used for lookups. A tree only ever grows;
//! a new generation is a new tree, so indices never dangle.

use crate::rect::ComputedLayout;
use crate::view::{content_hash, View, ViewStyle};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

/// Index of a node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a node of a merged tree takes its computed layout from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSource {
    /// A node of the tree being transitioned away from.
    From(NodeIndex),
    /// A node of the tree being transitioned to.
    To(NodeIndex),
}

/// Hints for measuring a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInfo {
    pub content: String,
    pub font_size: f32,
    pub line_height: Option<f32>,
    pub max_lines: Option<u32>,
}

impl TextInfo {
    pub fn hash(&self) -> u64 {
        content_hash(self)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedNode {
    /// The authored view this node renders.
    pub view: Arc<View>,
    /// Style after variable and variant resolution; shared with the view when nothing changed.
    pub style: Arc<ViewStyle>,
    pub text_info: Option<TextInfo>,
    /// Key of this node in the layout solver.
    pub layout_id: i32,
    /// Id before variant resolution; stays the same when a component instance switches variant.
    pub unresolved_id: String,
    pub computed_layout: Option<ComputedLayout>,
    /// Set when an animation drives the size and solver output must not overwrite it.
    pub override_layout_size: bool,
    pub layout_source: Option<LayoutSource>,
    parent: Option<NodeIndex>,
    first_child: Option<NodeIndex>,
    last_child: Option<NodeIndex>,
    next_sibling: Option<NodeIndex>,
}

impl ResolvedNode {
    pub fn new(
        view: Arc<View>,
        style: Arc<ViewStyle>,
        layout_id: i32,
        unresolved_id: &str,
    ) -> ResolvedNode {
        ResolvedNode {
            view,
            style,
            text_info: None,
            layout_id,
            unresolved_id: unresolved_id.to_string(),
            computed_layout: None,
            override_layout_size: false,
            layout_source: None,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.view.id
    }

    pub fn name(&self) -> &str {
        &self.view.name
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeIndex> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeIndex> {
        self.next_sibling
    }

    /// A copy sharing view and style, not linked into any tree.
    pub fn detached(&self) -> ResolvedNode {
        ResolvedNode {
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            ..self.clone()
        }
    }
}

/// An arena of resolved nodes. The top level may hold several roots when a merge places two
/// versions of the root side by side.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTree {
    nodes: Vec<ResolvedNode>,
    root: Option<NodeIndex>,
    last_root: Option<NodeIndex>,
}

impl ResolvedTree {
    pub fn new() -> ResolvedTree {
        ResolvedTree::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Top-level nodes in order.
    pub fn roots(&self) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.root,
        }
    }

    pub fn children(&self, node: NodeIndex) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self[node].first_child,
        }
    }

    /// Appends a node as the last child of `parent`, or as the last root.
    pub fn add(&mut self, parent: Option<NodeIndex>, mut node: ResolvedNode) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        node.parent = parent;
        node.first_child = None;
        node.last_child = None;
        node.next_sibling = None;
        self.nodes.push(node);

        let prev = match parent {
            Some(p) => {
                let prev = self[p].last_child;
                if prev.is_none() {
                    self[p].first_child = Some(idx);
                }
                self[p].last_child = Some(idx);
                prev
            }
            None => {
                let prev = self.last_root;
                if prev.is_none() {
                    self.root = Some(idx);
                }
                self.last_root = Some(idx);
                prev
            }
        };
        if let Some(prev) = prev {
            self[prev].next_sibling = Some(idx);
        }
        idx
    }

    /// Copies a subtree of another tree under `parent`, recording where each copy came from.
    pub fn copy_subtree(
        &mut self,
        src: &ResolvedTree,
        src_node: NodeIndex,
        parent: Option<NodeIndex>,
        source: fn(NodeIndex) -> LayoutSource,
    ) -> NodeIndex {
        let mut copy = src[src_node].detached();
        copy.layout_source = Some(source(src_node));
        let idx = self.add(parent, copy);
        let mut child = src[src_node].first_child;
        while let Some(c) = child {
            self.copy_subtree(src, c, Some(idx), source);
            child = src[c].next_sibling;
        }
        idx
    }

    /// Pre-order traversal of the whole forest.
    pub fn iter(&self) -> PreOrder<'_> {
        let mut stack: Vec<_> = self.roots().collect();
        stack.reverse();
        PreOrder { tree: self, stack }
    }

    /// Pre-order traversal of one subtree.
    pub fn descendants(&self, node: NodeIndex) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![node],
        }
    }

    /// First node in pre-order whose id or unresolved id equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeIndex> {
        self.iter().find(|&n| self[n].id() == id || self[n].unresolved_id == id)
    }

    /// An indented outline of names, layout ids and rects, for debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeIndex, usize)> = self.roots().map(|n| (n, 0)).collect();
        stack.reverse();
        while let Some((node, depth)) = stack.pop() {
            let n = &self[node];
            let _ = write!(
                out,
                "{:indent$}{} #{}",
                "",
                n.name(),
                n.layout_id,
                indent = depth * 2
            );
            if let Some(l) = &n.computed_layout {
                let _ = write!(out, " ({}, {}) {}x{}", l.left, l.top, l.width, l.height);
            }
            out.push('\n');
            let children: Vec<_> = self.children(node).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        out
    }
}

impl Index<NodeIndex> for ResolvedTree {
    type Output = ResolvedNode;
    fn index(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.nodes[idx.index()]
    }
}

impl IndexMut<NodeIndex> for ResolvedTree {
    fn index_mut(&mut self, idx: NodeIndex) -> &mut ResolvedNode {
        &mut self.nodes[idx.index()]
    }
}

/// Iterates a sibling chain.
pub struct Siblings<'a> {
    tree: &'a ResolvedTree,
    next: Option<NodeIndex>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = NodeIndex;
    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        self.next = self.tree[current].next_sibling;
        Some(current)
    }
}

pub struct PreOrder<'a> {
    tree: &'a ResolvedTree,
    stack: Vec<NodeIndex>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = NodeIndex;
    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.stack.pop()?;
        let children: Vec<_> = self.tree.children(current).collect();
        self.stack.extend(children.into_iter().rev());
        Some(current)
    }
}

#[cfg(test)]
pub(crate) fn test_node(id: &str, name: &str, layout_id: i32) -> ResolvedNode {
    use crate::view::ViewShape;
    let view = Arc::new(View::new_container(
        id,
        name,
        ViewShape::Rect { is_mask: false },
        ViewStyle::default(),
    ));
    let style = view.style.clone();
    ResolvedNode::new(view, style, layout_id, id)
}

#[test]
fn test_tree_links() {
    let mut tree = ResolvedTree::new();
    let root = tree.add(None, test_node("0", "root", 0));
    let a = tree.add(Some(root), test_node("1", "a", 1));
    let b = tree.add(Some(root), test_node("2", "b", 2));
    let a1 = tree.add(Some(a), test_node("3", "a1", 3));

    assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(tree[a1].parent(), Some(a));
    assert_eq!(tree.iter().collect::<Vec<_>>(), vec![root, a, a1, b]);
    assert_eq!(tree.descendants(a).count(), 2);
    assert_eq!(tree.find_by_id("3"), Some(a1));
    assert_eq!(tree.find_by_id("nope"), None);

    // a second top-level node becomes a sibling of the root
    let extra = tree.add(None, test_node("4", "extra", 4));
    assert_eq!(tree.roots().collect::<Vec<_>>(), vec![root, extra]);
    assert!(tree.dump().contains("  a1 #3"));
}

#[test]
fn test_copy_subtree_records_source() {
    let mut src = ResolvedTree::new();
    let root = src.add(None, test_node("0", "root", 0));
    let child = src.add(Some(root), test_node("1", "child", 1));

    let mut dst = ResolvedTree::new();
    let copied = dst.copy_subtree(&src, root, None, LayoutSource::To);
    assert_eq!(dst.len(), 2);
    assert_eq!(dst[copied].layout_source, Some(LayoutSource::To(root)));
    let copied_child = dst.children(copied).next().unwrap();
    assert_eq!(dst[copied_child].layout_source, Some(LayoutSource::To(child)));
    assert_eq!(dst[copied_child].layout_id, 1);
}

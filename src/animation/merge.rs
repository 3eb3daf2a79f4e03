use super::{AnimatedItem, AnimationControl, AnimationRequest};
use crate::resolved::{LayoutSource, NodeIndex, ResolvedNode, ResolvedTree};
use crate::transform::AffineTransform;
use crate::view::ViewShape;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Builds the tree to display while transitioning from `from` to `to`.
///
/// `requests` is keyed by the id or unresolved id of a node in `from`. Each request whose
/// destination node exists in `to` gets its `control` set; the rest of `from` is copied as is.
/// Without requests the result is a plain copy of `from`.
///
/// Both trees must already be laid out; the merged tree takes its layout from them through
/// [`update_derived_layout`](crate::layout::update_derived_layout) and the animated items.
pub fn merge(
    from: &ResolvedTree,
    to: &ResolvedTree,
    requests: &mut HashMap<String, AnimationRequest>,
) -> ResolvedTree {
    let mut merger = Merger {
        from,
        to,
        out: ResolvedTree::new(),
        matched: HashSet::new(),
    };
    let roots: Vec<_> = from.roots().collect();
    if requests.is_empty() {
        for root in roots {
            merger.out.copy_subtree(from, root, None, LayoutSource::From);
        }
        return merger.out;
    }

    for root in roots {
        merger.visit(root, None, requests);
    }
    merger.out
}

struct Merger<'a> {
    from: &'a ResolvedTree,
    to: &'a ResolvedTree,
    out: ResolvedTree,
    /// layout ids of `from` nodes already paired with a `to` node
    matched: HashSet<i32>,
}

impl<'a> Merger<'a> {
    fn visit(
        &mut self,
        node: NodeIndex,
        parent: Option<NodeIndex>,
        requests: &mut HashMap<String, AnimationRequest>,
    ) {
        let from = self.from;
        let n = &from[node];
        let key = [n.id(), n.unresolved_id.as_str()]
            .iter()
            .find(|key| {
                requests
                    .get(**key)
                    .map_or(false, |r| r.control.is_none())
            })
            .map(|key| key.to_string());

        if let Some(request) = key.and_then(|key| requests.get_mut(&key)) {
            match self.to.find_by_id(&request.to_node_id) {
                Some(target) => {
                    let mut items = Vec::new();
                    let root = self.merge_recursive(node, target, parent, &mut items);
                    debug!(
                        "animation {} from {} to {}: {} items",
                        request.animation_id,
                        n.name(),
                        request.to_node_id,
                        items.len()
                    );
                    if !items.is_empty() {
                        request.control = Some(AnimationControl { root, items });
                    }
                }
                None => {
                    warn!(
                        "animation {} target {} not found, showing {} unchanged",
                        request.animation_id,
                        request.to_node_id,
                        n.name()
                    );
                    self.out.copy_subtree(from, node, parent, LayoutSource::From);
                }
            }
            return;
        }

        let idx = self.out.add(parent, copy_of(n, LayoutSource::From(node)));
        for child in from.children(node) {
            self.visit(child, Some(idx), requests);
        }
    }

    fn merge_recursive(
        &mut self,
        from_node: NodeIndex,
        to_node: NodeIndex,
        parent: Option<NodeIndex>,
        items: &mut Vec<AnimatedItem>,
    ) -> NodeIndex {
        let (from, to) = (self.from, self.to);
        let f = &from[from_node];
        let t = &to[to_node];
        self.matched.insert(f.layout_id);

        if !tweenable(f, t) {
            let faded = self
                .out
                .copy_subtree(from, from_node, parent, LayoutSource::From);
            items.push(AnimatedItem::FadeOut {
                node: faded,
                opacity: f.style.node.opacity,
            });
            items.push(self.layout_tween(faded, f, t));
            let shown = self.out.copy_subtree(to, to_node, parent, LayoutSource::To);
            items.push(AnimatedItem::FadeIn {
                node: shown,
                opacity: t.style.node.opacity,
            });
            items.push(self.layout_tween(shown, f, t));
            return shown;
        }

        let idx = self.out.add(parent, copy_of(t, LayoutSource::To(to_node)));
        for to_child in to.children(to_node) {
            let name = to[to_child].name();
            let pair = from.children(from_node).find(|&c| {
                from[c].name() == name && !self.matched.contains(&from[c].layout_id)
            });
            match pair {
                Some(from_child) => {
                    self.merge_recursive(from_child, to_child, Some(idx), items);
                }
                None => {
                    let added = self
                        .out
                        .copy_subtree(to, to_child, Some(idx), LayoutSource::To);
                    items.push(AnimatedItem::FadeIn {
                        node: added,
                        opacity: to[to_child].style.node.opacity,
                    });
                }
            }
        }
        for from_child in from.children(from_node) {
            if !self.matched.contains(&from[from_child].layout_id) {
                let removed = self
                    .out
                    .copy_subtree(from, from_child, Some(idx), LayoutSource::From);
                items.push(AnimatedItem::FadeOut {
                    node: removed,
                    opacity: from[from_child].style.node.opacity,
                });
            }
        }

        items.push(self.layout_tween(idx, f, t));
        if let (Some(ViewShape::Arc(a)), Some(ViewShape::Arc(b))) =
            (f.view.shape(), t.view.shape())
        {
            items.push(AnimatedItem::ArcTween {
                node: idx,
                from: a.clone(),
                to: b.clone(),
            });
        }
        idx
    }

    fn layout_tween(
        &mut self,
        node: NodeIndex,
        from: &ResolvedNode,
        to: &ResolvedNode,
    ) -> AnimatedItem {
        self.out[node].override_layout_size = true;
        let (a, b) = (from.style.node.transform, to.style.node.transform);
        let transform = if a != b {
            Some((
                a.unwrap_or(AffineTransform::IDENTITY).decompose(),
                b.unwrap_or(AffineTransform::IDENTITY).decompose(),
            ))
        } else {
            None
        };
        AnimatedItem::LayoutTween {
            node,
            from: from.computed_layout,
            to: to.computed_layout,
            transform,
        }
    }
}

fn copy_of(node: &ResolvedNode, source: LayoutSource) -> ResolvedNode {
    let mut copy = node.detached();
    copy.layout_source = Some(source);
    copy
}

/// Same family of morphable shape, and no paint changes.
fn tweenable(from: &ResolvedNode, to: &ResolvedNode) -> bool {
    let kinds = (
        from.view.shape().and_then(|s| s.tween_kind()),
        to.view.shape().and_then(|s| s.tween_kind()),
    );
    match kinds {
        (Some(a), Some(b)) if a == b => {
            from.style.node.fills == to.style.node.fills
                && from.style.node.strokes == to.style.node.strokes
        }
        _ => false,
    }
}

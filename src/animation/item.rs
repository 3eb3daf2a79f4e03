use crate::rect::ComputedLayout;
use crate::resolved::{NodeIndex, ResolvedTree};
use crate::transform::Decomposed;
use crate::view::{ArcShape, ViewData, ViewShape};
use std::sync::Arc;

/// One animated property change on a node of a merged tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatedItem {
    /// Opacity from 0 to the node's own opacity.
    FadeIn { node: NodeIndex, opacity: f32 },
    /// Opacity from the node's own opacity to 0.
    FadeOut { node: NodeIndex, opacity: f32 },
    /// Bounds, and the transform if it changed.
    LayoutTween {
        node: NodeIndex,
        from: Option<ComputedLayout>,
        to: Option<ComputedLayout>,
        transform: Option<(Decomposed, Decomposed)>,
    },
    /// Arc geometry. Flags take the destination's values.
    ArcTween {
        node: NodeIndex,
        from: ArcShape,
        to: ArcShape,
    },
}

impl AnimatedItem {
    pub fn node(&self) -> NodeIndex {
        match self {
            AnimatedItem::FadeIn { node, .. }
            | AnimatedItem::FadeOut { node, .. }
            | AnimatedItem::LayoutTween { node, .. }
            | AnimatedItem::ArcTween { node, .. } => *node,
        }
    }

    pub fn apply(&self, tree: &mut ResolvedTree, progress: f32) {
        match self {
            AnimatedItem::FadeIn { node, opacity } => {
                Arc::make_mut(&mut tree[*node].style).node.opacity = opacity * progress;
            }
            AnimatedItem::FadeOut { node, opacity } => {
                Arc::make_mut(&mut tree[*node].style).node.opacity = opacity * (1. - progress);
            }
            AnimatedItem::LayoutTween {
                node,
                from,
                to,
                transform,
            } => {
                let n = &mut tree[*node];
                n.computed_layout = match (from, to) {
                    (Some(from), Some(to)) => Some(from.lerp(to, progress)),
                    (from, to) => to.or(*from),
                };
                n.override_layout_size = true;
                if let Some((from, to)) = transform {
                    Arc::make_mut(&mut n.style).node.transform =
                        Some(from.lerp(to, progress).recompose());
                }
            }
            AnimatedItem::ArcTween { node, from, to } => {
                let shape = ViewShape::Arc(lerp_arc(from, to, progress));
                if let ViewData::Container { shape: current, .. } =
                    &mut Arc::make_mut(&mut tree[*node].view).data
                {
                    *current = shape;
                }
            }
        }
    }
}

fn lerp_arc(from: &ArcShape, to: &ArcShape, t: f32) -> ArcShape {
    let mix = |a: f32, b: f32| a + (b - a) * t;
    ArcShape {
        start_angle_degrees: mix(from.start_angle_degrees, to.start_angle_degrees),
        sweep_angle_degrees: mix(from.sweep_angle_degrees, to.sweep_angle_degrees),
        inner_radius: mix(from.inner_radius, to.inner_radius),
        corner_radius: mix(from.corner_radius, to.corner_radius),
        stroke_cap: to.stroke_cap,
        is_mask: to.is_mask,
    }
}

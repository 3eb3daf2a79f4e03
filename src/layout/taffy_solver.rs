//! A [`LayoutSolver`] backed by taffy's flexbox implementation.

use super::{LayoutNode, LayoutNodeList, LayoutSolver};
use crate::error::Error;
use crate::rect::ComputedLayout;
use crate::view::{self, LayoutStyle};
use log::{error, trace};
use std::collections::{HashMap, HashSet};
use std::fmt;
use taffy::prelude::{AvailableSpace, Size};
use taffy::{NodeId, TaffyTree};

/// Measures a node's content: `(layout_id, known_width, known_height, available_width,
/// available_height) -> (width, height)`. Unknown known sizes are passed as 0; unbounded
/// available sizes as `f32::MAX`.
pub type MeasureFn = dyn FnMut(i32, f32, f32, f32, f32) -> (f32, f32) + Send;

pub struct TaffySolver {
    // node context is the layout id, present only for nodes that need measuring
    taffy: TaffyTree<i32>,
    layouts: HashMap<NodeId, ComputedLayout>,
    /// layout id -> forced size
    fixed_sizes: HashMap<i32, (f32, f32)>,
    layout_id_to_node: HashMap<i32, NodeId>,
    node_to_layout_id: HashMap<NodeId, i32>,
    names: HashMap<i32, String>,
    roots: HashSet<i32>,
    available: Size<AvailableSpace>,
    measure: Box<MeasureFn>,
}

impl fmt::Debug for TaffySolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TaffySolver")
            .field("nodes", &self.layout_id_to_node.len())
            .field("roots", &self.roots)
            .finish()
    }
}

impl TaffySolver {
    pub fn new(
        measure: impl FnMut(i32, f32, f32, f32, f32) -> (f32, f32) + Send + 'static,
    ) -> TaffySolver {
        TaffySolver {
            taffy: TaffyTree::new(),
            layouts: HashMap::new(),
            fixed_sizes: HashMap::new(),
            layout_id_to_node: HashMap::new(),
            node_to_layout_id: HashMap::new(),
            names: HashMap::new(),
            roots: HashSet::new(),
            available: Size {
                width: AvailableSpace::MaxContent,
                height: AvailableSpace::MaxContent,
            },
            measure: Box::new(measure),
        }
    }

    /// A solver for trees without measured content.
    pub fn without_measure() -> TaffySolver {
        TaffySolver::new(|_, w, h, _, _| (w, h))
    }

    /// Space the roots are laid out in. `None` means unbounded.
    pub fn set_available_space(&mut self, width: Option<f32>, height: Option<f32>) {
        let space = |v: Option<f32>| v.map_or(AvailableSpace::MaxContent, AvailableSpace::Definite);
        self.available = Size {
            width: space(width),
            height: space(height),
        };
    }

    pub fn contains(&self, layout_id: i32) -> bool {
        self.layout_id_to_node.contains_key(&layout_id)
    }

    /// Ids of nodes that were added without a parent.
    pub fn roots(&self) -> impl Iterator<Item = i32> + '_ {
        self.roots.iter().copied()
    }

    /// Forces a node to a fixed size, e.g. when the host renders something of its own there, and
    /// recomputes layout from `root_layout_id`.
    ///
    /// The size sticks across restyles until the node is removed.
    pub fn set_node_size(
        &mut self,
        layout_id: i32,
        root_layout_id: i32,
        width: f32,
        height: f32,
    ) -> Result<HashMap<i32, ComputedLayout>, Error> {
        self.fixed_sizes.insert(layout_id, (width, height));
        if let Some(&node) = self.layout_id_to_node.get(&layout_id) {
            let mut style = self.taffy.style(node).map_err(layout_error)?.clone();
            fix_size(&mut style, width, height);
            self.taffy.set_style(node, style).map_err(layout_error)?;
        }
        self.compute(root_layout_id)
    }

    fn add_style(&mut self, node: LayoutNode) -> Result<(), Error> {
        let mut style = taffy_style(&node.style);
        if let Some(&(w, h)) = self.fixed_sizes.get(&node.layout_id) {
            fix_size(&mut style, w, h);
        }
        let context = if node.needs_measure {
            Some(node.layout_id)
        } else {
            None
        };

        if let Some(&existing) = self.layout_id_to_node.get(&node.layout_id) {
            self.taffy.set_style(existing, style).map_err(layout_error)?;
            self.taffy.set_node_context(existing, context).map_err(layout_error)?;
        } else {
            let created = self.taffy.new_leaf(style).map_err(layout_error)?;
            self.taffy.set_node_context(created, context).map_err(layout_error)?;
            self.layout_id_to_node.insert(node.layout_id, created);
            self.node_to_layout_id.insert(created, node.layout_id);
        }
        self.names.insert(node.layout_id, node.name);

        // children are attached by child-list records, not here
        match node.parent_layout_id {
            Some(_) => self.roots.remove(&node.layout_id),
            None => self.roots.insert(node.layout_id),
        };
        Ok(())
    }

    fn set_children(&mut self, parent_layout_id: i32, children: &[i32]) -> Result<(), Error> {
        let parent = match self.layout_id_to_node.get(&parent_layout_id) {
            Some(&parent) => parent,
            None => {
                error!("child list for unknown layout id {}", parent_layout_id);
                return Ok(());
            }
        };
        let child_nodes: Vec<NodeId> = children
            .iter()
            .filter_map(|id| self.layout_id_to_node.get(id).copied())
            .collect();
        self.taffy.set_children(parent, &child_nodes).map_err(layout_error)
    }

    fn compute(&mut self, root_layout_id: i32) -> Result<HashMap<i32, ComputedLayout>, Error> {
        trace!("compute layout from {}", root_layout_id);
        let root = match self.layout_id_to_node.get(&root_layout_id) {
            Some(&root) => root,
            None => {
                return Err(Error::Layout(format!(
                    "no node for root layout id {}",
                    root_layout_id
                )))
            }
        };

        let measure = &mut self.measure;
        self.taffy
            .compute_layout_with_measure(
                root,
                self.available,
                |known, available, _node, context, _style| {
                    let layout_id = match context {
                        Some(id) => *id,
                        None => return Size::ZERO,
                    };
                    let space = |s: AvailableSpace| match s {
                        AvailableSpace::Definite(v) => v,
                        AvailableSpace::MaxContent => f32::MAX,
                        AvailableSpace::MinContent => 0.,
                    };
                    let (width, height) = (*measure)(
                        layout_id,
                        known.width.unwrap_or(0.),
                        known.height.unwrap_or(0.),
                        space(available.width),
                        space(available.height),
                    );
                    Size { width, height }
                },
            )
            .map_err(layout_error)?;

        let mut changed = HashMap::new();
        self.collect_changed(root, None, &mut changed)?;
        Ok(changed)
    }

    /// Walks the tree and records every layout that differs from the last pass, plus the parent
    /// of each since children are positioned relative to it.
    fn collect_changed(
        &mut self,
        node: NodeId,
        parent_layout_id: Option<i32>,
        changed: &mut HashMap<i32, ComputedLayout>,
    ) -> Result<(), Error> {
        let layout_id = match self.node_to_layout_id.get(&node) {
            Some(&id) => id,
            None => return Ok(()),
        };
        let layout = from_taffy_layout(self.taffy.layout(node).map_err(layout_error)?);
        if self.layouts.get(&node) != Some(&layout) {
            changed.insert(layout_id, layout);
            if let Some(parent_id) = parent_layout_id {
                if !changed.contains_key(&parent_id) {
                    let parent_layout = self
                        .layout_id_to_node
                        .get(&parent_id)
                        .and_then(|parent| self.layouts.get(parent))
                        .copied();
                    if let Some(parent_layout) = parent_layout {
                        changed.insert(parent_id, parent_layout);
                    }
                }
            }
            self.layouts.insert(node, layout);
        }

        for child in self.taffy.children(node).map_err(layout_error)? {
            self.collect_changed(child, Some(layout_id), changed)?;
        }
        Ok(())
    }

    /// An indented outline of the solver's tree, for debugging.
    pub fn dump(&self, root_layout_id: i32) -> String {
        let mut out = String::new();
        if let Some(&root) = self.layout_id_to_node.get(&root_layout_id) {
            self.dump_node(root, 0, &mut out);
        }
        out
    }

    fn dump_node(&self, node: NodeId, depth: usize, out: &mut String) {
        let layout_id = self.node_to_layout_id.get(&node).copied().unwrap_or(-1);
        let name = self
            .names
            .get(&layout_id)
            .map(|s| s.as_str())
            .unwrap_or("?");
        if let Ok(layout) = self.taffy.layout(node) {
            out.push_str(&format!(
                "{:indent$}{} #{} ({}, {}) {}x{}\n",
                "",
                name,
                layout_id,
                layout.location.x,
                layout.location.y,
                layout.size.width,
                layout.size.height,
                indent = depth * 2
            ));
        }
        if let Ok(children) = self.taffy.children(node) {
            for child in children {
                self.dump_node(child, depth + 1, out);
            }
        }
    }
}

impl LayoutSolver for TaffySolver {
    fn remove_node(&mut self, layout_id: i32) {
        let node = match self.layout_id_to_node.remove(&layout_id) {
            Some(node) => node,
            None => return,
        };
        // the parent has to be recomputed or the removed child leaves a gap
        if let Some(parent) = self.taffy.parent(node) {
            if let Err(e) = self.taffy.mark_dirty(parent) {
                error!("unable to mark parent of {} dirty: {}", layout_id, e);
            }
        }
        if let Err(e) = self.taffy.remove(node) {
            error!("unable to remove layout node {}: {}", layout_id, e);
        }
        self.node_to_layout_id.remove(&node);
        self.layouts.remove(&node);
        self.names.remove(&layout_id);
        self.roots.remove(&layout_id);
        self.fixed_sizes.remove(&layout_id);
    }

    fn submit(
        &mut self,
        root_layout_id: i32,
        batch: LayoutNodeList,
    ) -> Result<HashMap<i32, ComputedLayout>, Error> {
        for node in batch.layout_nodes {
            self.add_style(node)?;
        }
        for record in &batch.parent_children {
            self.set_children(record.parent_layout_id, &record.child_layout_ids)?;
        }
        self.compute(root_layout_id)
    }
}

fn layout_error(err: taffy::TaffyError) -> Error {
    Error::Layout(err.to_string())
}

fn fix_size(style: &mut taffy::Style, width: f32, height: f32) {
    let size = Size {
        width: taffy::Dimension::Length(width),
        height: taffy::Dimension::Length(height),
    };
    style.min_size = size;
    style.size = size;
    style.max_size = size;
}

fn from_taffy_layout(layout: &taffy::Layout) -> ComputedLayout {
    ComputedLayout {
        order: layout.order,
        width: layout.size.width,
        height: layout.size.height,
        left: layout.location.x,
        top: layout.location.y,
        content_width: layout.content_size.width,
        content_height: layout.content_size.height,
    }
}

fn dimension(d: view::Dimension) -> taffy::Dimension {
    match d {
        view::Dimension::Auto => taffy::Dimension::Auto,
        view::Dimension::Points(p) => taffy::Dimension::Length(p),
        view::Dimension::Percent(p) => taffy::Dimension::Percent(p),
    }
}

fn length_percentage(d: view::Dimension) -> taffy::LengthPercentage {
    match d {
        view::Dimension::Points(p) => taffy::LengthPercentage::Length(p),
        view::Dimension::Percent(p) => taffy::LengthPercentage::Percent(p),
        view::Dimension::Auto => taffy::LengthPercentage::Length(0.),
    }
}

fn length_percentage_auto(d: view::Dimension) -> taffy::LengthPercentageAuto {
    match d {
        view::Dimension::Points(p) => taffy::LengthPercentageAuto::Length(p),
        view::Dimension::Percent(p) => taffy::LengthPercentageAuto::Percent(p),
        view::Dimension::Auto => taffy::LengthPercentageAuto::Auto,
    }
}

fn rect<T>(sides: &view::Sides<view::Dimension>, f: fn(view::Dimension) -> T) -> taffy::Rect<T> {
    taffy::Rect {
        left: f(sides.left),
        right: f(sides.right),
        top: f(sides.top),
        bottom: f(sides.bottom),
    }
}

/// Converts a layout style into taffy's representation.
pub fn taffy_style(style: &LayoutStyle) -> taffy::Style {
    use crate::view::{AlignItems, FlexDirection, JustifyContent, PositionType};

    let flex_direction = match style.flex_direction {
        FlexDirection::Row => taffy::FlexDirection::Row,
        FlexDirection::Column => taffy::FlexDirection::Column,
        FlexDirection::RowReverse => taffy::FlexDirection::RowReverse,
        FlexDirection::ColumnReverse => taffy::FlexDirection::ColumnReverse,
    };
    let spacing = taffy::LengthPercentage::Length(style.item_spacing);
    let zero = taffy::LengthPercentage::Length(0.);
    let gap = match style.flex_direction {
        FlexDirection::Row | FlexDirection::RowReverse => Size {
            width: spacing,
            height: zero,
        },
        FlexDirection::Column | FlexDirection::ColumnReverse => Size {
            width: zero,
            height: spacing,
        },
    };

    taffy::Style {
        display: taffy::Display::Flex,
        position: match style.position_type {
            PositionType::Relative => taffy::Position::Relative,
            PositionType::Absolute => taffy::Position::Absolute,
        },
        flex_direction,
        align_items: Some(match style.align_items {
            AlignItems::FlexStart => taffy::AlignItems::FlexStart,
            AlignItems::FlexEnd => taffy::AlignItems::FlexEnd,
            AlignItems::Center => taffy::AlignItems::Center,
            AlignItems::Stretch => taffy::AlignItems::Stretch,
            AlignItems::Baseline => taffy::AlignItems::Baseline,
        }),
        justify_content: Some(match style.justify_content {
            JustifyContent::FlexStart => taffy::JustifyContent::FlexStart,
            JustifyContent::FlexEnd => taffy::JustifyContent::FlexEnd,
            JustifyContent::Center => taffy::JustifyContent::Center,
            JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
            JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
            JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
        }),
        size: Size {
            width: dimension(style.width),
            height: dimension(style.height),
        },
        min_size: Size {
            width: dimension(style.min_width),
            height: dimension(style.min_height),
        },
        max_size: Size {
            width: dimension(style.max_width),
            height: dimension(style.max_height),
        },
        margin: rect(&style.margin, length_percentage_auto),
        padding: rect(&style.padding, length_percentage),
        inset: rect(&style.inset, length_percentage_auto),
        flex_grow: style.flex_grow,
        flex_shrink: style.flex_shrink,
        flex_basis: dimension(style.flex_basis),
        gap,
        ..taffy::Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutParentChildren;
    use crate::view::{Dimension, FlexDirection};

    fn fixed(width: f32, height: f32) -> LayoutStyle {
        LayoutStyle {
            width: Dimension::Points(width),
            height: Dimension::Points(height),
            ..LayoutStyle::default()
        }
    }

    fn node(layout_id: i32, parent: Option<i32>, style: LayoutStyle) -> LayoutNode {
        LayoutNode {
            layout_id,
            parent_layout_id: parent,
            style,
            name: format!("n{}", layout_id),
            needs_measure: false,
        }
    }

    fn column_of_two() -> LayoutNodeList {
        let root = LayoutStyle {
            flex_direction: FlexDirection::Column,
            item_spacing: 5.,
            ..fixed(100., 100.)
        };
        LayoutNodeList {
            layout_nodes: vec![
                node(0, None, root),
                node(1, Some(0), fixed(20., 10.)),
                node(2, Some(0), fixed(30., 10.)),
            ],
            parent_children: vec![LayoutParentChildren {
                parent_layout_id: 0,
                child_layout_ids: vec![1, 2],
            }],
        }
    }

    #[test]
    fn lays_out_a_column() {
        let mut solver = TaffySolver::without_measure();
        let layouts = solver.submit(0, column_of_two()).unwrap();
        assert_eq!(layouts[&0].width, 100.);
        assert_eq!(layouts[&1].top, 0.);
        assert_eq!(layouts[&2].top, 15.);
        assert_eq!(layouts[&2].width, 30.);
        assert!(solver.roots().eq(std::iter::once(0)));
    }

    #[test]
    fn only_changed_layouts_are_returned() {
        let mut solver = TaffySolver::without_measure();
        solver.submit(0, column_of_two()).unwrap();

        let batch = LayoutNodeList {
            layout_nodes: vec![node(2, Some(0), fixed(40., 10.))],
            parent_children: vec![],
        };
        let layouts = solver.submit(0, batch).unwrap();
        assert_eq!(layouts[&2].width, 40.);
        // the parent comes along with its changed child
        assert!(layouts.contains_key(&0));
        assert!(!layouts.contains_key(&1));
    }

    #[test]
    fn removal_closes_the_gap() {
        let mut solver = TaffySolver::without_measure();
        solver.submit(0, column_of_two()).unwrap();

        solver.remove_node(1);
        assert!(!solver.contains(1));
        let layouts = solver.submit(0, LayoutNodeList::default()).unwrap();
        assert_eq!(layouts[&2].top, 0.);
    }

    #[test]
    fn measured_nodes_ask_the_host() {
        let mut solver = TaffySolver::new(|id, _, _, _, _| {
            if id == 1 {
                (42., 7.)
            } else {
                (0., 0.)
            }
        });
        let mut batch = LayoutNodeList {
            layout_nodes: vec![
                node(0, None, LayoutStyle::default()),
                node(1, Some(0), LayoutStyle::default()),
            ],
            parent_children: vec![LayoutParentChildren {
                parent_layout_id: 0,
                child_layout_ids: vec![1],
            }],
        };
        batch.layout_nodes[1].needs_measure = true;
        let layouts = solver.submit(0, batch).unwrap();
        assert_eq!((layouts[&1].width, layouts[&1].height), (42., 7.));
    }

    #[test]
    fn fixed_size_survives_restyle() {
        let mut solver = TaffySolver::without_measure();
        solver.submit(0, column_of_two()).unwrap();
        let layouts = solver.set_node_size(1, 0, 60., 60.).unwrap();
        assert_eq!(layouts[&1].width, 60.);

        let batch = LayoutNodeList {
            layout_nodes: vec![node(1, Some(0), fixed(5., 5.))],
            parent_children: vec![],
        };
        solver.submit(0, batch).unwrap();
        assert!(solver.dump(0).contains("n1 #1 (0, 0) 60x60"));
    }

    #[test]
    fn unknown_root_is_an_error() {
        let mut solver = TaffySolver::without_measure();
        assert!(matches!(
            solver.submit(7, LayoutNodeList::default()),
            Err(Error::Layout(_))
        ));
    }
}

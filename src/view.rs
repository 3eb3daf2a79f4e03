//! The authored document tree.
//!
//! Views are produced once per document decode and never mutated afterwards: anything that needs
//! a different view builds a new one, sharing unchanged parts through `Arc`.

use crate::color::Color;
use crate::transform::AffineTransform;
use core::hash::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// A length in a layout style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    Auto,
    Points(f32),
    /// Fraction of the parent, 0..=1.
    Percent(f32),
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sides<T> {
    pub left: T,
    pub right: T,
    pub top: T,
    pub bottom: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionType {
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FlexDirection {
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlignItems {
    FlexStart,
    FlexEnd,
    Center,
    Stretch,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JustifyContent {
    FlexStart,
    FlexEnd,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

/// Flexbox properties consumed by the layout solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutStyle {
    pub position_type: PositionType,
    pub flex_direction: FlexDirection,
    pub align_items: AlignItems,
    pub justify_content: JustifyContent,
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,
    pub margin: Sides<Dimension>,
    pub padding: Sides<Dimension>,
    /// Offsets for absolutely positioned nodes.
    pub inset: Sides<Dimension>,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,
    pub item_spacing: f32,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        LayoutStyle {
            position_type: PositionType::Relative,
            flex_direction: FlexDirection::Row,
            align_items: AlignItems::FlexStart,
            justify_content: JustifyContent::FlexStart,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_width: Dimension::Auto,
            max_height: Dimension::Auto,
            margin: Sides::default(),
            padding: Sides::default(),
            inset: Sides::default(),
            flex_grow: 0.,
            flex_shrink: 0.,
            flex_basis: Dimension::Auto,
            item_spacing: 0.,
        }
    }
}

/// A color that may be bound to a design variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColorOrVar {
    Color(Color),
    Var { id: String, fallback: Color },
}

/// A fill or stroke paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Solid(ColorOrVar),
    Image { key: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f32,
    pub line_height: Option<f32>,
    pub max_lines: Option<u32>,
    pub color: ColorOrVar,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font_size: 14.,
            line_height: None,
            max_lines: None,
            color: ColorOrVar::Color(Color::BLACK),
        }
    }
}

/// Paint properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub visible: bool,
    pub opacity: f32,
    pub fills: Vec<Paint>,
    pub strokes: Vec<Paint>,
    pub stroke_weight: f32,
    pub transform: Option<AffineTransform>,
    pub text: TextStyle,
}

impl Default for NodeStyle {
    fn default() -> Self {
        NodeStyle {
            visible: true,
            opacity: 1.,
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke_weight: 0.,
            transform: None,
            text: TextStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewStyle {
    pub layout: LayoutStyle,
    pub node: NodeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrokeCap {
    None,
    Round,
    Square,
}

/// Arc-specific shape parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcShape {
    pub start_angle_degrees: f32,
    pub sweep_angle_degrees: f32,
    pub inner_radius: f32,
    pub corner_radius: f32,
    pub stroke_cap: StrokeCap,
    pub is_mask: bool,
}

/// Shape of a container view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewShape {
    Rect { is_mask: bool },
    RoundRect {
        corner_radius: [f32; 4],
        is_mask: bool,
    },
    Path { is_mask: bool },
    Arc(ArcShape),
    VectorRect {
        corner_radius: [f32; 4],
        is_mask: bool,
    },
}

/// Shape families that can be morphed into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenKind {
    Rect,
    VectorRect,
    Arc,
}

impl ViewShape {
    pub fn tween_kind(&self) -> Option<TweenKind> {
        match self {
            ViewShape::Rect { .. } | ViewShape::RoundRect { .. } => Some(TweenKind::Rect),
            ViewShape::VectorRect { .. } => Some(TweenKind::VectorRect),
            ViewShape::Arc(_) => Some(TweenKind::Arc),
            ViewShape::Path { .. } => None,
        }
    }
}

/// The component a view is an instance of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub id: String,
    /// Variant name, e.g. `"state=on, size=large"`.
    pub name: String,
    pub component_set_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewData {
    Container {
        shape: ViewShape,
        children: Vec<Arc<View>>,
    },
    Text { content: String },
}

/// A node in the authored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub style: Arc<ViewStyle>,
    pub data: ViewData,
    pub component_info: Option<ComponentInfo>,
    /// Variable collection id -> mode id, applied to this subtree.
    pub explicit_variable_modes: Option<HashMap<String, String>>,
}

impl View {
    pub fn new_container(id: &str, name: &str, shape: ViewShape, style: ViewStyle) -> View {
        View {
            id: id.to_string(),
            name: name.to_string(),
            style: Arc::new(style),
            data: ViewData::Container {
                shape,
                children: Vec::new(),
            },
            component_info: None,
            explicit_variable_modes: None,
        }
    }

    pub fn new_text(id: &str, name: &str, content: &str, style: ViewStyle) -> View {
        View {
            id: id.to_string(),
            name: name.to_string(),
            style: Arc::new(style),
            data: ViewData::Text {
                content: content.to_string(),
            },
            component_info: None,
            explicit_variable_modes: None,
        }
    }

    /// Appends a child. Does nothing for text views.
    pub fn with_child(mut self, child: View) -> View {
        if let ViewData::Container { children, .. } = &mut self.data {
            children.push(Arc::new(child));
        }
        self
    }

    pub fn with_component(mut self, info: ComponentInfo) -> View {
        self.component_info = Some(info);
        self
    }

    pub fn children(&self) -> &[Arc<View>] {
        match &self.data {
            ViewData::Container { children, .. } => children,
            ViewData::Text { .. } => &[],
        }
    }

    pub fn shape(&self) -> Option<&ViewShape> {
        match &self.data {
            ViewData::Container { shape, .. } => Some(shape),
            ViewData::Text { .. } => None,
        }
    }

    /// Finds a view in this subtree by id, depth-first.
    pub fn find(&self, id: &str) -> Option<&View> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }
}

struct HashWriter<'a, H: Hasher>(&'a mut H);

impl<'a, H: Hasher> io::Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hashes the serialized form of a value; floats hash by bit pattern.
pub(crate) fn content_hash<T: Serialize>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    if let Err(e) = bincode::serialize_into(HashWriter(&mut hasher), value) {
        log::error!("unable to hash value: {}", e);
    }
    hasher.finish()
}

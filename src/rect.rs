//! Computed layout rectangles.

use serde::{Deserialize, Serialize};

/// The result of a layout pass for one node, relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComputedLayout {
    /// Relative paint order among siblings.
    pub order: u32,
    pub width: f32,
    pub height: f32,
    /// Offset of the top-left corner from the parent's origin.
    pub left: f32,
    pub top: f32,
    /// Size of the content, which may overflow the node's own size.
    pub content_width: f32,
    pub content_height: f32,
}

impl ComputedLayout {
    /// Creates a layout with the given bounds and matching content size.
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> ComputedLayout {
        ComputedLayout {
            order: 0,
            width,
            height,
            left,
            top,
            content_width: width,
            content_height: height,
        }
    }

    /// Interpolates bounds linearly. Order is taken from the destination.
    pub fn lerp(&self, to: &ComputedLayout, t: f32) -> ComputedLayout {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        ComputedLayout {
            order: to.order,
            width: mix(self.width, to.width),
            height: mix(self.height, to.height),
            left: mix(self.left, to.left),
            top: mix(self.top, to.top),
            content_width: mix(self.content_width, to.content_width),
            content_height: mix(self.content_height, to.content_height),
        }
    }
}

#[test]
fn test_layout_lerp() {
    let a = ComputedLayout::new(0., 0., 10., 20.);
    let b = ComputedLayout::new(10., 40., 30., 20.);
    let mid = a.lerp(&b, 0.5);
    assert_eq!(mid, ComputedLayout::new(5., 20., 20., 20.));
    assert_eq!(a.lerp(&b, 1.), b);
}

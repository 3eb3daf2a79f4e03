//! Animated transitions between two resolved trees.
//!
//! [`merge`] builds a presentation tree from the displayed tree and a newly resolved one, and
//! fills in an [`AnimationControl`] for every request it could locate. The host drives each control
//! with a progress value from its own clock, usually through [`Transition::progress`].

mod item;
mod merge;

pub use item::AnimatedItem;
pub use merge::merge;

use crate::resolved::{NodeIndex, ResolvedTree};

/// Easing curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    FastOutSlowIn,
    /// A custom curve through `(x1, y1)` and `(x2, y2)`.
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Maps linear progress in 0..=1 to eased progress.
    pub fn transform(&self, fraction: f32) -> f32 {
        let fraction = fraction.max(0.).min(1.);
        match *self {
            Easing::Linear => fraction,
            Easing::EaseIn => cubic_bezier(0.42, 0., 1., 1., fraction),
            Easing::EaseOut => cubic_bezier(0., 0., 0.58, 1., fraction),
            Easing::EaseInOut => cubic_bezier(0.42, 0., 0.58, 1., fraction),
            Easing::FastOutSlowIn => cubic_bezier(0.4, 0., 0.2, 1., fraction),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(x1, y1, x2, y2, fraction),
        }
    }
}

fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    if x <= 0. || x >= 1. {
        return x;
    }

    // polynomial coefficients for a curve from (0, 0) to (1, 1)
    let coefficients = |p1: f32, p2: f32| {
        let c = 3. * p1;
        let b = 3. * (p2 - p1) - c;
        (1. - c - b, b, c)
    };
    let (ax, bx, cx) = coefficients(x1, x2);
    let (ay, by, cy) = coefficients(y1, y2);
    let sample = |a: f32, b: f32, c: f32, t: f32| ((a * t + b) * t + c) * t;
    let derivative = |a: f32, b: f32, c: f32, t: f32| (3. * a * t + 2. * b) * t + c;

    // newton-raphson first, bisection if the slope is too flat
    let mut t = x;
    for _ in 0..8 {
        let error = sample(ax, bx, cx, t) - x;
        if error.abs() < 1e-6 {
            return sample(ay, by, cy, t);
        }
        let slope = derivative(ax, bx, cx, t);
        if slope.abs() < 1e-6 {
            break;
        }
        t -= error / slope;
    }

    let (mut lo, mut hi) = (0., 1.);
    t = x;
    for _ in 0..32 {
        let value = sample(ax, bx, cx, t);
        if (value - x).abs() < 1e-6 {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.;
    }
    sample(ay, by, cy, t)
}

/// Timing of one animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub duration_ms: u64,
    pub delay_ms: u64,
    pub easing: Easing,
}

impl Default for Transition {
    fn default() -> Self {
        Transition {
            duration_ms: 300,
            delay_ms: 0,
            easing: Easing::FastOutSlowIn,
        }
    }
}

impl Transition {
    pub fn new(duration_ms: u64, easing: Easing) -> Transition {
        Transition {
            duration_ms,
            delay_ms: 0,
            easing,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Transition {
        self.delay_ms = delay_ms;
        self
    }

    /// Eased progress `elapsed_ms` after the animation was started.
    pub fn progress(&self, elapsed_ms: u64) -> f32 {
        if elapsed_ms < self.delay_ms {
            return 0.;
        }
        if self.duration_ms == 0 {
            return 1.;
        }
        let linear = (elapsed_ms - self.delay_ms) as f32 / self.duration_ms as f32;
        self.easing.transform(linear)
    }

    pub fn is_finished(&self, elapsed_ms: u64) -> bool {
        elapsed_ms >= self.delay_ms + self.duration_ms
    }
}

/// A transition the host wants to play, keyed by the node it starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationRequest {
    /// Id of the node in the destination tree.
    pub to_node_id: String,
    pub animation_id: u64,
    /// The animation this one replaces, if it was started while another was running.
    pub interrupted_id: Option<u64>,
    pub transition: Transition,
    /// Filled in by [`merge`] once both endpoints were found.
    pub control: Option<AnimationControl>,
}

impl AnimationRequest {
    pub fn new(to_node_id: &str, animation_id: u64, transition: Transition) -> AnimationRequest {
        AnimationRequest {
            to_node_id: to_node_id.to_string(),
            animation_id,
            interrupted_id: None,
            transition,
            control: None,
        }
    }

    pub fn interrupting(mut self, animation_id: u64) -> AnimationRequest {
        self.interrupted_id = Some(animation_id);
        self
    }
}

/// The merged subtree of one request and the items that animate it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationControl {
    pub root: NodeIndex,
    pub items: Vec<AnimatedItem>,
}

impl AnimationControl {
    /// Applies every item at `progress`, in order.
    pub fn apply(&self, tree: &mut ResolvedTree, progress: f32) {
        for item in &self.items {
            item.apply(tree, progress);
        }
    }
}

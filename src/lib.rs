//! Live design documents rendered as resolved node trees.
//!
//! The pieces, from the network inward:
//!
//! - [`live`] keeps subscribed documents fresh on a background worker and hands new versions to
//!   the UI thread.
//! - [`resolve`] turns a document plus app state (customizations, variant properties) into a
//!   [`ResolvedTree`].
//! - [`layout`] feeds resolved trees to a layout solver incrementally and writes the rects back.
//! - [`animation`] merges the displayed tree with a new one so the change can be animated.

pub mod animation;
pub mod color;
pub mod doc;
mod error;
pub mod layout;
pub mod live;
pub mod persist;
pub mod rect;
pub mod resolve;
pub mod resolved;
pub mod transform;
pub mod variables;
pub mod variant;
pub mod view;

pub use animation::{merge, AnimatedItem, AnimationControl, AnimationRequest, Easing, Transition};
pub use doc::DocContent;
pub use error::{Error, FetchError};
pub use layout::{LayoutBridge, LayoutIdAllocator, LayoutSolver, TaffySolver};
pub use live::{LiveUpdate, LiveUpdateConfig};
pub use rect::ComputedLayout;
pub use resolve::{Customizations, Resolver, VariantState};
pub use resolved::{NodeIndex, ResolvedNode, ResolvedTree};
pub use view::View;

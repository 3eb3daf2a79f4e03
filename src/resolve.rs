//! Building resolved trees from documents.
//!
//! Resolution applies everything that depends on app state: hidden nodes are dropped, component
//! instances are swapped for the variant the current properties select, variable-bound colors
//! are looked up in the active modes, and text overrides are applied. Every node gets a layout id
//! from the allocator, so resolving the same document twice yields the same ids.

use crate::doc::DocContent;
use crate::error::Error;
use crate::layout::{LayoutIdAllocator, LayoutKey};
use crate::resolved::{NodeIndex, ResolvedNode, ResolvedTree, TextInfo};
use crate::variables::VariableMap;
use crate::variant::{find_variant, parse_variant_name, VariantProperties};
use crate::view::{ColorOrVar, Paint, View, ViewData, ViewStyle};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-node overrides set by the app, keyed by node name.
#[derive(Debug, Clone, Default)]
pub struct Customizations {
    hidden: HashSet<String>,
    text: HashMap<String, String>,
    variant_properties: HashMap<String, VariantProperties>,
}

impl Customizations {
    pub fn new() -> Customizations {
        Customizations::default()
    }

    pub fn set_visible(&mut self, node_name: &str, visible: bool) {
        if visible {
            self.hidden.remove(node_name);
        } else {
            self.hidden.insert(node_name.to_string());
        }
    }

    pub fn is_hidden(&self, node_name: &str) -> bool {
        self.hidden.contains(node_name)
    }

    pub fn set_text(&mut self, node_name: &str, text: &str) {
        self.text.insert(node_name.to_string(), text.to_string());
    }

    pub fn text(&self, node_name: &str) -> Option<&str> {
        self.text.get(node_name).map(|s| s.as_str())
    }

    /// Requests a variant property value for the component instance with this name.
    pub fn set_variant_property(&mut self, node_name: &str, property: &str, value: &str) {
        self.variant_properties
            .entry(node_name.to_string())
            .or_default()
            .insert(property.to_string(), value.to_string());
    }

    pub fn variant_properties(&self, node_name: &str) -> Option<&VariantProperties> {
        self.variant_properties.get(node_name)
    }
}

/// Variant property values applied to every instance that declares the property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantState {
    properties: VariantProperties,
}

impl VariantState {
    pub fn new() -> VariantState {
        VariantState::default()
    }

    pub fn set(&mut self, property: &str, value: &str) {
        self.properties.insert(property.to_string(), value.to_string());
    }

    pub fn clear(&mut self, property: &str) {
        self.properties.remove(property);
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(|s| s.as_str())
    }
}

pub struct Resolver<'a> {
    doc: &'a DocContent,
    customizations: &'a Customizations,
    variant_state: &'a VariantState,
    ids: &'a mut LayoutIdAllocator,
}

impl<'a> Resolver<'a> {
    pub fn new(
        doc: &'a DocContent,
        customizations: &'a Customizations,
        variant_state: &'a VariantState,
        ids: &'a mut LayoutIdAllocator,
    ) -> Resolver<'a> {
        Resolver {
            doc,
            customizations,
            variant_state,
            ids,
        }
    }

    /// Resolves the top-level node `root_name`.
    ///
    /// The allocator is left mid-generation: call
    /// [`removal_nodes`](LayoutIdAllocator::removal_nodes) once the tree is final to learn which
    /// ids went away.
    pub fn resolve(&mut self, root_name: &str) -> Result<ResolvedTree, Error> {
        let root = self.doc.root(root_name).ok_or(Error::MissingRoot)?.clone();
        let mut tree = ResolvedTree::new();
        self.resolve_view(&mut tree, &root, None, "", &HashMap::new());
        Ok(tree)
    }

    fn resolve_view(
        &mut self,
        tree: &mut ResolvedTree,
        view: &Arc<View>,
        parent: Option<NodeIndex>,
        instance_path: &str,
        modes: &HashMap<String, String>,
    ) {
        if !view.style.node.visible || self.customizations.is_hidden(&view.name) {
            return;
        }

        let resolved_view = match self.select_variant(view) {
            Some(v) => v,
            None => return,
        };
        let resolved_view = match self.customizations.text(&view.name) {
            Some(text) => with_text(&resolved_view, text),
            None => resolved_view,
        };

        let modes = match &resolved_view.explicit_variable_modes {
            Some(explicit) => {
                let mut modes = modes.clone();
                modes.extend(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
                modes
            }
            None => modes.clone(),
        };

        let style = resolve_colors(&resolved_view.style, &self.doc.variables, &modes);
        let layout_id = self.ids.id_for(LayoutKey::new(instance_path, &view.id));
        let mut node = ResolvedNode::new(resolved_view.clone(), style, layout_id, &view.id);
        if let ViewData::Text { content } = &resolved_view.data {
            let text = &node.style.node.text;
            node.text_info = Some(TextInfo {
                content: content.clone(),
                font_size: text.font_size,
                line_height: text.line_height,
                max_lines: text.max_lines,
            });
        }
        let idx = tree.add(parent, node);

        let child_path = if view.component_info.is_some() {
            if instance_path.is_empty() {
                view.id.clone()
            } else {
                format!("{};{}", instance_path, view.id)
            }
        } else {
            instance_path.to_string()
        };
        for child in resolved_view.children() {
            self.resolve_view(tree, child, Some(idx), &child_path, &modes);
        }
    }

    /// The view to render for `view`: itself, or the variant its properties select.
    ///
    /// `None` means a different variant was asked for and none matched.
    fn select_variant(&self, view: &Arc<View>) -> Option<Arc<View>> {
        let info = match &view.component_info {
            Some(info) => info,
            None => return Some(view.clone()),
        };

        let own = parse_variant_name(&info.name);
        let mut target = own.clone();
        for (key, value) in target.iter_mut() {
            if let Some(v) = self.variant_state.get(key) {
                *value = v.to_string();
            }
        }
        if let Some(overrides) = self.customizations.variant_properties(&view.name) {
            target.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if target == own {
            return Some(view.clone());
        }

        let candidates = self.doc.variant_names(&info.component_set_name);
        let name = match find_variant(&target, candidates) {
            Some(name) => name,
            None => {
                warn!(
                    "no variant of {} matches {:?}, hiding {}",
                    info.component_set_name, target, view.name
                );
                return None;
            }
        };
        if name == info.name {
            return Some(view.clone());
        }
        let variant = self.doc.variant(&info.component_set_name, name)?;
        Some(Arc::new(with_base_style(variant, view)))
    }
}

/// The variant, placed where the instance was.
fn with_base_style(variant: &View, instance: &View) -> View {
    let mut replaced = variant.clone();
    let style = Arc::make_mut(&mut replaced.style);
    style.layout.margin = instance.style.layout.margin;
    style.layout.position_type = instance.style.layout.position_type;
    style.layout.inset = instance.style.layout.inset;
    replaced.name = instance.name.clone();
    replaced
}

fn with_text(view: &Arc<View>, text: &str) -> Arc<View> {
    match &view.data {
        ViewData::Text { content } if content != text => {
            let mut replaced = (**view).clone();
            replaced.data = ViewData::Text {
                content: text.to_string(),
            };
            Arc::new(replaced)
        }
        _ => view.clone(),
    }
}

/// Replaces variable-bound colors with their values; shares the style if there are none.
fn resolve_colors(
    style: &Arc<ViewStyle>,
    variables: &VariableMap,
    modes: &HashMap<String, String>,
) -> Arc<ViewStyle> {
    let is_var = |c: &ColorOrVar| matches!(c, ColorOrVar::Var { .. });
    let paint_is_var = |p: &Paint| matches!(p, Paint::Solid(c) if is_var(c));
    let node = &style.node;
    if !node.fills.iter().any(paint_is_var)
        && !node.strokes.iter().any(paint_is_var)
        && !is_var(&node.text.color)
    {
        return style.clone();
    }

    let resolve = |c: &ColorOrVar| ColorOrVar::Color(variables.resolve_color(c, modes));
    let resolve_paint = |p: &Paint| match p {
        Paint::Solid(c) => Paint::Solid(resolve(c)),
        other => other.clone(),
    };
    let mut resolved = (**style).clone();
    resolved.node.fills = node.fills.iter().map(resolve_paint).collect();
    resolved.node.strokes = node.strokes.iter().map(resolve_paint).collect();
    resolved.node.text.color = resolve(&node.text.color);
    Arc::new(resolved)
}

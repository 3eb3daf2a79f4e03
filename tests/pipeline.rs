use livedesign::animation::{merge, AnimationRequest, Easing, Transition};
use livedesign::doc::DocContent;
use livedesign::layout::{update_derived_layout, LayoutBridge, LayoutIdAllocator, TaffySolver};
use livedesign::resolve::{Customizations, Resolver, VariantState};
use livedesign::view::{
    ComponentInfo, Dimension, FlexDirection, LayoutStyle, View, ViewShape, ViewStyle,
};
use livedesign::ResolvedTree;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn sized(width: f32, height: f32) -> ViewStyle {
    let mut style = ViewStyle::default();
    style.layout.width = Dimension::Points(width);
    style.layout.height = Dimension::Points(height);
    style
}

fn rect(id: &str, name: &str, style: ViewStyle) -> View {
    View::new_container(id, name, ViewShape::Rect { is_mask: false }, style)
}

fn toggle(id: &str, state: &str, width: f32) -> View {
    let knob = rect(&format!("{}-knob", id), "knob", sized(5., 5.));
    rect(id, &format!("state={}", state), sized(width, 10.))
        .with_child(knob)
        .with_component(ComponentInfo {
            id: id.to_string(),
            name: format!("state={}", state),
            component_set_name: "Toggle".to_string(),
        })
}

fn document() -> DocContent {
    let mut root_style = sized(100., 100.);
    root_style.layout = LayoutStyle {
        flex_direction: FlexDirection::Column,
        ..root_style.layout
    };
    let mut instance = toggle("9:1", "off", 20.);
    instance.name = "toggle".into();
    let root = rect("1:1", "Main", root_style)
        .with_child(rect("1:2", "header", sized(100., 30.)))
        .with_child(instance);

    let mut doc = DocContent::new("D1");
    doc.views.insert("Main".into(), Arc::new(root));
    let mut variants = BTreeMap::new();
    variants.insert("state=off".to_string(), Arc::new(toggle("5:1", "off", 20.)));
    variants.insert("state=on".to_string(), Arc::new(toggle("5:2", "on", 40.)));
    doc.component_sets.insert("Toggle".into(), variants);
    doc
}

struct Frame {
    ids: LayoutIdAllocator,
    bridge: LayoutBridge<TaffySolver>,
}

impl Frame {
    fn new() -> Frame {
        Frame {
            ids: LayoutIdAllocator::new(),
            bridge: LayoutBridge::new(TaffySolver::without_measure()),
        }
    }

    fn resolve(&mut self, doc: &DocContent, state: &VariantState) -> ResolvedTree {
        let custom = Customizations::new();
        let mut tree = Resolver::new(doc, &custom, state, &mut self.ids)
            .resolve("Main")
            .unwrap();
        let removal = self.ids.removal_nodes();
        self.bridge.layout_tree(&mut tree, &removal).unwrap();
        tree
    }
}

fn named<'t>(tree: &'t ResolvedTree, name: &str) -> &'t livedesign::ResolvedNode {
    tree.iter().map(|n| &tree[n]).find(|n| n.name() == name).unwrap()
}

#[test]
fn variant_switch_animates_size() {
    let doc = document();
    let mut frame = Frame::new();

    let before = frame.resolve(&doc, &VariantState::new());
    let toggle_before = named(&before, "toggle").computed_layout.unwrap();
    assert_eq!((toggle_before.top, toggle_before.width), (30., 20.));

    let mut state = VariantState::new();
    state.set("state", "on");
    let after = frame.resolve(&doc, &state);
    assert_eq!(named(&after, "toggle").computed_layout.unwrap().width, 40.);
    assert_eq!(
        named(&after, "toggle").layout_id,
        named(&before, "toggle").layout_id
    );

    let mut requests = HashMap::new();
    let transition = Transition::new(200, Easing::Linear);
    let request = AnimationRequest::new("9:1", 1, transition);
    requests.insert("9:1".to_string(), request);
    let mut merged = merge(&before, &after, &mut requests);
    update_derived_layout(&mut merged, &before, &after);

    // untouched nodes take their layout from the source trees
    assert_eq!(
        named(&merged, "header").computed_layout,
        named(&before, "header").computed_layout
    );

    let control = requests["9:1"].control.clone().unwrap();
    control.apply(&mut merged, transition.progress(100));
    let mid = named(&merged, "toggle").computed_layout.unwrap();
    assert_eq!(mid.width, 30.);
    assert_eq!(mid.top, 30.);
    // the knob was matched by name across variants, not faded
    let knobs = merged.iter().filter(|&n| merged[n].name() == "knob");
    assert_eq!(knobs.count(), 1);

    control.apply(&mut merged, transition.progress(200));
    assert_eq!(named(&merged, "toggle").computed_layout.unwrap().width, 40.);
}

#[test]
fn steady_state_frames_reuse_layout() {
    let doc = document();
    let mut frame = Frame::new();
    let first = frame.resolve(&doc, &VariantState::new());
    let second = frame.resolve(&doc, &VariantState::new());
    assert_eq!(first.dump(), second.dump());

    let merged = merge(&first, &second, &mut HashMap::new());
    assert_eq!(merged.dump(), first.dump());
}

//! Navigation, activation and key routing through the registry.
use std::sync::Arc;

use deck_protocol::{
    DisplayDescriptor, icons,
    render::{RecordingRenderer, RenderOp},
};
use eventbus::{EventBus, Payload, Topic};
use panels::{
    Behavior, Catalog, Face, ItemCtx, Label, Layout, NodeId, PanelBehavior, PlainPanel, Registry, Slot,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Button that logs every hook call.
struct Spy {
    /// Shared log.
    log: Arc<Mutex<Vec<String>>>,
}

impl Behavior for Spy {
    fn render(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(DisplayDescriptor::new(ctx.name).with_icon("up"))
    }

    fn press(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        self.log.lock().push(format!("press {} {:?}", ctx.name, ctx.key));
        Some(DisplayDescriptor::new(ctx.name).with_icon("down"))
    }

    fn release(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        self.log.lock().push(format!("release {}", ctx.name));
        Some(DisplayDescriptor::new(ctx.name).with_icon("up"))
    }

    fn tick(&mut self, ctx: &ItemCtx<'_>, index: u64, _count: u64) -> Option<DisplayDescriptor> {
        Some(DisplayDescriptor::new(format!("{} t{index}", ctx.name)))
    }

    fn hidden_tick(&mut self, ctx: &ItemCtx<'_>, index: u64, _count: u64) {
        self.log.lock().push(format!("hidden {} {index}", ctx.name));
    }

    fn dispatch(&mut self, ctx: &ItemCtx<'_>, source: &str, data: &Value) {
        self.log.lock().push(format!("dispatch {} from {source}: {data}", ctx.name));
    }
}

/// Panel that logs activation changes.
struct PanelSpy {
    /// Shared log.
    log: Arc<Mutex<Vec<String>>>,
}

impl PanelBehavior for PanelSpy {
    fn activated(&mut self, ctx: &ItemCtx<'_>) {
        self.log.lock().push(format!("activated {}", ctx.name));
    }

    fn deactivated(&mut self, ctx: &ItemCtx<'_>) {
        self.log.lock().push(format!("deactivated {}", ctx.name));
    }
}

/// Registry wired to a recording renderer.
struct Fixture {
    /// Tree under test.
    reg: Registry,
    /// Everything drawn.
    renderer: Arc<RecordingRenderer>,
    /// Shared bus.
    bus: EventBus,
    /// Hook calls from spies.
    log: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new() -> Self {
        let bus = EventBus::new();
        let renderer = Arc::new(RecordingRenderer::new());
        let reg = Registry::new(
            bus.clone(),
            Layout::new(3, 5).unwrap(),
            renderer.clone(),
            Catalog::with_builtins(),
        );
        Self {
            reg,
            renderer,
            bus,
            log: Arc::default(),
        }
    }

    fn button(&mut self, parent: NodeId, name: &str) -> NodeId {
        let spy = Spy {
            log: self.log.clone(),
        };
        self.reg.add_button(parent, name, None, Box::new(spy)).unwrap()
    }

    fn panel(&mut self, parent: NodeId, name: &str) -> NodeId {
        let spy = PanelSpy {
            log: self.log.clone(),
        };
        self.reg.add_panel(parent, name, None, Box::new(spy)).unwrap()
    }

    fn click(&mut self, key: usize) {
        self.reg.key_change(key, true);
        self.reg.key_change(key, false);
    }
}

#[test]
fn press_release_round_trip() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    let a = f.button(root, "a");
    f.reg.repaginate(root).unwrap();
    f.renderer.take();

    f.reg.key_change(0, true);
    assert!(f.reg.is_pressed(a));
    f.reg.key_change(0, false);
    assert!(!f.reg.is_pressed(a));

    let ops = f.renderer.take();
    assert_eq!(
        ops,
        vec![
            RenderOp::Key(0, DisplayDescriptor::new("a").with_icon("down")),
            RenderOp::Key(0, DisplayDescriptor::new("a").with_icon("up")),
        ]
    );
    assert_eq!(*f.log.lock(), vec!["press a Some(0)", "release a"]);
}

#[test]
fn key_outside_page_is_ignored() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    f.button(root, "a");
    f.reg.repaginate(root).unwrap();
    f.renderer.take();

    f.click(7);
    assert!(f.renderer.take().is_empty());
    assert!(f.log.lock().is_empty());
}

#[test]
fn navigate_into_and_back_out_of_subpanel() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    f.button(root, "a");
    let sub = f.panel(root, "sub");
    f.button(sub, "x");
    f.reg.repaginate(sub).unwrap();
    f.reg.repaginate(root).unwrap();
    assert_eq!(f.reg.active(), root);

    // "sub" sits at key 1 of the root
    f.reg.key_change(1, true);
    assert_eq!(
        f.renderer.ops().last(),
        Some(&RenderOp::Key(
            1,
            DisplayDescriptor::new("sub").with_icon(icons::PANEL_PRESSED)
        ))
    );
    f.renderer.take();
    f.reg.key_change(1, false);
    assert_eq!(f.reg.active(), sub);
    assert!(f.reg.is_active(sub));
    assert!(!f.reg.is_active(root));
    assert_eq!(f.reg.active_count(), 1);

    let screen = f.renderer.screen();
    assert_eq!(screen.len(), 2);
    assert_eq!(screen[0].1.icon.as_deref(), Some(icons::PARENT));
    assert_eq!(screen[1].1.text, "x");

    // parent key
    f.click(0);
    assert_eq!(f.reg.active(), root);
    assert_eq!(f.reg.active_count(), 1);
    assert_eq!(
        *f.log.lock(),
        vec!["activated sub", "deactivated sub"]
    );
}

#[test]
fn paging_through_a_full_panel() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    let sub = f.panel(root, "sub");
    for i in 0..17 {
        f.button(sub, &format!("b{i}"));
    }
    f.reg.repaginate(sub).unwrap();
    f.reg.repaginate(root).unwrap();
    f.reg.activate(sub).unwrap();

    assert_eq!(f.reg.pages(sub).unwrap().len(), 2);
    assert!(f.reg.has_next_page(sub));
    assert!(!f.reg.has_previous_page(sub));
    assert!(f.reg.has_parent(sub));
    assert_eq!(f.reg.get_item(sub, 14).unwrap(), Slot::NextPage);

    f.click(14);
    assert_eq!(f.reg.current_page(sub).unwrap(), 1);
    assert_eq!(f.reg.get_item(sub, 0).unwrap(), Slot::PreviousPage);
    let b16 = f.reg.child(sub, "b16").unwrap();
    assert_eq!(f.reg.get_item_position(sub, b16).unwrap(), 4);
    assert!(f.reg.get_item(sub, 5).is_err());

    // past the end is a no-op
    assert!(!f.reg.next_page());
    f.click(0);
    assert_eq!(f.reg.current_page(sub).unwrap(), 0);
    assert!(!f.reg.previous_page());

    let b0 = f.reg.child(sub, "b0").unwrap();
    assert_eq!(f.reg.get_item_by_2d_position(sub, 1, 0).unwrap(), Slot::Item(b0));
    assert!(f.reg.get_item_position(sub, b16).is_err());
}

#[test]
fn go_to_parent_on_root_is_noop() {
    let mut f = Fixture::new();
    assert!(!f.reg.go_to_parent());
    assert_eq!(f.reg.active(), f.reg.root());
}

#[test]
fn activation_exclusivity_over_navigation() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    let a = f.panel(root, "a");
    let b = f.panel(a, "b");
    let c = f.panel(root, "c");
    for p in [b, a, c, root] {
        f.reg.repaginate(p).unwrap();
    }
    for target in [a, b, c, root, b, b, a] {
        f.reg.activate(target).unwrap();
        assert_eq!(f.reg.active_count(), 1);
        assert!(f.reg.is_active(target));
        f.reg.go_to_parent();
        assert_eq!(f.reg.active_count(), 1);
    }
}

#[test]
fn lifecycle_notifications_reach_the_bus() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    let sub = f.panel(root, "sub");
    f.reg.repaginate(sub).unwrap();
    f.reg.repaginate(root).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener = f.bus.register("listener");
    for topic in [Topic::PanelActivated, Topic::PanelDeactivated, Topic::KeyChanged] {
        let seen = seen.clone();
        f.bus.subscribe(listener, topic.clone(), move |p| {
            seen.lock().push((topic.clone(), p.clone()));
            None
        });
    }
    let pressed = Arc::new(Mutex::new(0));
    let counter = pressed.clone();
    f.bus.subscribe(f.reg.subscriber(sub).unwrap(), Topic::ItemPressed, move |_| {
        *counter.lock() += 1;
        None
    });

    f.reg.take_notifications();
    f.click(0);
    assert!(seen.lock().is_empty(), "delivery waits for flush");
    f.reg.flush();

    let seen = seen.lock();
    assert_eq!(
        seen[0],
        (Topic::KeyChanged, Payload::KeyChange { key: 0, pressed: true })
    );
    assert!(seen.contains(&(Topic::PanelDeactivated, Payload::Panel { path: "/".into() })));
    assert!(seen.contains(&(Topic::PanelActivated, Payload::Panel { path: "/sub".into() })));
    assert_eq!(*pressed.lock(), 1);
}

#[test]
fn ticks_redraw_visible_items_only() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    f.button(root, "a");
    let sub = f.panel(root, "sub");
    f.button(sub, "hidden");
    f.reg.repaginate(sub).unwrap();
    f.reg.repaginate(root).unwrap();
    f.renderer.take();

    f.reg.tick(3, 6);
    assert_eq!(
        f.renderer.take(),
        vec![RenderOp::Key(0, DisplayDescriptor::new("a t3"))]
    );

    f.reg.hidden_tick(4, 4);
    let log = f.log.lock();
    assert!(log.contains(&"hidden a 4".to_string()));
    assert!(log.contains(&"hidden hidden 4".to_string()));
}

#[test]
fn dispatch_reaches_every_child() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    f.button(root, "a");
    f.button(root, "b");
    f.reg.dispatch(root, "test", &json!({"k": 1})).unwrap();
    let log = f.log.lock();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("dispatch a from test"));
}

#[test]
fn duplicate_child_names_are_rejected() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    f.button(root, "a");
    let err = f
        .reg
        .add_button(root, "a", None, Box::new(Label::new(Face::default())))
        .unwrap_err();
    assert!(matches!(err, panels::Error::DuplicateName { .. }));
}

#[test]
fn detach_active_subtree_reactivates_parent() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    let sub = f.panel(root, "sub");
    let inner = f.panel(sub, "inner");
    f.button(inner, "x");
    for p in [inner, sub, root] {
        f.reg.repaginate(p).unwrap();
    }
    f.reg.activate(inner).unwrap();
    let subscriptions_before = f.bus.subscription_count();
    f.bus
        .subscribe(f.reg.subscriber(inner).unwrap(), Topic::Exit, |_| None);
    assert_eq!(f.bus.subscription_count(), subscriptions_before + 1);

    let removed = f.reg.detach_path("/sub").unwrap();
    assert_eq!(removed, 3);
    assert_eq!(f.reg.active(), root);
    assert_eq!(f.reg.active_count(), 1);
    assert!(!f.reg.contains(sub));
    assert!(f.reg.children(root).is_empty());
    assert_eq!(f.bus.subscription_count(), subscriptions_before);
    assert!(f.reg.find("/sub").is_none());
    // root redrawn with nothing on it
    assert_eq!(f.renderer.ops().last(), Some(&RenderOp::Clear));
    assert!(f.reg.detach(root).is_err());
}

#[test]
fn structure_lists_the_tree() {
    let mut f = Fixture::new();
    let root = f.reg.root();
    f.button(root, "a");
    let sub = f.reg.add_panel(root, "sub", None, Box::new(PlainPanel)).unwrap();
    f.button(sub, "x");
    f.reg.repaginate(sub).unwrap();
    f.reg.repaginate(root).unwrap();
    assert_eq!(
        f.reg.structure(),
        "[root] (1 page) *\n  a\n  [sub] (1 page)\n    x\n"
    );
    assert_eq!(f.reg.find("root/sub/x"), f.reg.child(sub, "x"));
    assert_eq!(f.reg.path_of(sub), "/sub");
}

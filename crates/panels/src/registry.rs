use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use deck_protocol::{DisplayDescriptor, Renderer, icons};
use eventbus::{EventBus, Payload, SubscriberId, Topic};
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, info, trace, warn};

use crate::{
    Behavior, Catalog, Error, ItemCtx, Layout, Notification, Outbox, Page, PanelBehavior,
    PanelLook, PlainPanel, Result, Slot, paginate,
};

new_key_type! {
    /// Handle to a node in the panel tree.
    pub struct NodeId;
}

/// Name of the root panel.
pub const ROOT_NAME: &str = "root";

/// A button's state.
struct ButtonNode {
    /// Held down.
    pressed: bool,
    /// Domain logic.
    behavior: Box<dyn Behavior>,
}

/// A panel's state.
struct PanelNode {
    /// Children in insertion order.
    children: Vec<NodeId>,
    /// Layout computed by the last repagination.
    pages: Vec<Page<NodeId>>,
    /// Index into `pages`.
    current_page: usize,
    /// Whether this is the active panel.
    active: bool,
    /// Held down while shown as a key in its parent.
    pressed: bool,
    /// Appearance overrides.
    look: PanelLook,
    /// Domain logic.
    behavior: Box<dyn PanelBehavior>,
}

/// Button or panel.
enum NodeKind {
    /// Leaf control.
    Button(ButtonNode),
    /// Container.
    Panel(PanelNode),
}

/// One tree node.
struct Node {
    /// Name, unique among siblings.
    name: String,
    /// Declarative source.
    path: Option<PathBuf>,
    /// Parent panel; `None` only for the root.
    parent: Option<NodeId>,
    /// Bus identity.
    subscriber: SubscriberId,
    /// Button or panel state.
    kind: NodeKind,
}

impl Node {
    /// Panel state, if this node is a panel.
    fn panel(&self) -> Option<&PanelNode> {
        match &self.kind {
            NodeKind::Panel(p) => Some(p),
            NodeKind::Button(_) => None,
        }
    }

    /// Mutable panel state, if this node is a panel.
    fn panel_mut(&mut self) -> Option<&mut PanelNode> {
        match &mut self.kind {
            NodeKind::Panel(p) => Some(p),
            NodeKind::Button(_) => None,
        }
    }
}

/// Build a context for `node` from disjoint borrows.
fn ctx<'a>(name: &'a str, path: Option<&'a Path>, id: SubscriberId, key: Option<usize>, outbox: &'a Outbox) -> ItemCtx<'a> {
    ItemCtx {
        name,
        path,
        id,
        key,
        outbox,
    }
}

/// Owner of the panel tree.
///
/// Tracks the single active panel, routes device key transitions into it,
/// and draws through the [`Renderer`]. Bus notifications raised while the
/// tree is borrowed are queued; call [`Registry::flush`] (or drain them with
/// [`Registry::take_notifications`]) once the registry is no longer locked.
pub struct Registry {
    /// Node arena.
    nodes: SlotMap<NodeId, Node>,
    /// Root panel.
    root: NodeId,
    /// The active panel.
    active: NodeId,
    /// Grid geometry.
    layout: Layout,
    /// Event bus.
    bus: EventBus,
    /// Key drawing.
    renderer: Arc<dyn Renderer>,
    /// Item type constructors.
    catalog: Catalog,
    /// Queued bus notifications.
    outbox: Outbox,
}

impl Registry {
    /// Create a registry holding an empty, active root panel.
    pub fn new(bus: EventBus, layout: Layout, renderer: Arc<dyn Renderer>, catalog: Catalog) -> Self {
        let mut nodes = SlotMap::with_key();
        let subscriber = bus.register(ROOT_NAME);
        let root = nodes.insert(Node {
            name: ROOT_NAME.to_string(),
            path: None,
            parent: None,
            subscriber,
            kind: NodeKind::Panel(PanelNode {
                children: Vec::new(),
                pages: paginate(&[], false, &layout),
                current_page: 0,
                active: true,
                pressed: false,
                look: PanelLook::default(),
                behavior: Box::new(PlainPanel),
            }),
        });
        Self {
            nodes,
            root,
            active: root,
            layout,
            bus,
            renderer,
            catalog,
            outbox: Outbox::default(),
        }
    }

    /// Root panel.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The active panel.
    pub fn active(&self) -> NodeId {
        self.active
    }

    /// Grid geometry.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The bus notifications are delivered on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Item type constructors.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Item type constructors, for registering new types.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Swap the renderer, e.g. once a device is opened.
    pub fn set_renderer(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderer = renderer;
    }

    /// Take queued bus notifications without delivering them.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.outbox.drain()
    }

    /// Deliver queued bus notifications.
    ///
    /// Handlers run on the caller's stack; they must not try to lock the
    /// registry if the caller holds it.
    pub fn flush(&mut self) {
        for n in self.outbox.drain() {
            n.deliver(&self.bus);
        }
    }

    /// Queue a topic notification.
    fn notify(&self, topic: Topic, payload: Payload) {
        self.outbox.push(Notification::Publish(topic, payload));
    }

    /// Queue an addressed notification to `id`.
    fn notify_node(&self, id: NodeId, topic: Topic, payload: Payload) {
        if let Some(n) = self.nodes.get(id) {
            self.outbox.push(Notification::Send(n.subscriber, topic, payload));
        }
    }

    // ---- tree queries ------------------------------------------------------

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node name.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.name.as_str())
    }

    /// Declarative source path.
    pub fn source_path(&self, id: NodeId) -> Option<&Path> {
        self.nodes.get(id).and_then(|n| n.path.as_deref())
    }

    /// Bus identity of a node.
    pub fn subscriber(&self, id: NodeId) -> Option<SubscriberId> {
        self.nodes.get(id).map(|n| n.subscriber)
    }

    /// Parent panel.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Whether the node is a panel.
    pub fn is_panel(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.panel().is_some())
    }

    /// Whether the node is held down.
    pub fn is_pressed(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| match &n.kind {
            NodeKind::Button(b) => b.pressed,
            NodeKind::Panel(p) => p.pressed,
        })
    }

    /// Whether the node is the active panel.
    pub fn is_active(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .and_then(Node::panel)
            .is_some_and(|p| p.active)
    }

    /// Children of a panel in insertion order; empty for buttons.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .and_then(Node::panel)
            .map(|p| p.children.as_slice())
            .unwrap_or(&[])
    }

    /// Child of `panel` named `name`.
    pub fn child(&self, panel: NodeId, name: &str) -> Option<NodeId> {
        self.children(panel)
            .iter()
            .copied()
            .find(|c| self.name(*c) == Some(name))
    }

    /// Every live node, root included.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Number of panels reporting active; one in a consistent tree.
    pub fn active_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.panel().is_some_and(|p| p.active))
            .count()
    }

    /// Slash-separated path from the root (`"/"` for the root itself).
    pub fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(n) = self.nodes.get(c) else { break };
            if n.parent.is_some() {
                parts.push(n.name.as_str());
            }
            cur = n.parent;
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Resolve a slash-separated path. Empty, `"/"` and `"root"` name the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut cur = self.root;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if cur == self.root && part == ROOT_NAME && self.child(cur, part).is_none() {
                continue;
            }
            cur = self.child(cur, part)?;
        }
        Some(cur)
    }

    /// Panel state or an error.
    fn panel_state(&self, id: NodeId) -> Result<&PanelNode> {
        let n = self.nodes.get(id).ok_or(Error::UnknownNode)?;
        n.panel().ok_or_else(|| Error::NotAPanel(n.name.clone()))
    }

    /// Pages of a panel.
    pub fn pages(&self, panel: NodeId) -> Result<&[Page<NodeId>]> {
        Ok(&self.panel_state(panel)?.pages)
    }

    /// Current page index of a panel.
    pub fn current_page(&self, panel: NodeId) -> Result<usize> {
        Ok(self.panel_state(panel)?.current_page)
    }

    /// Whether a panel has a page after the current one.
    pub fn has_next_page(&self, panel: NodeId) -> bool {
        self.panel_state(panel)
            .is_ok_and(|p| p.current_page + 1 < p.pages.len())
    }

    /// Whether a panel has a page before the current one.
    pub fn has_previous_page(&self, panel: NodeId) -> bool {
        self.panel_state(panel).is_ok_and(|p| p.current_page > 0)
    }

    /// Whether the node has a parent panel.
    pub fn has_parent(&self, id: NodeId) -> bool {
        self.parent(id).is_some()
    }

    /// Slot at `position` on the panel's current page.
    pub fn get_item(&self, panel: NodeId, position: usize) -> Result<Slot<NodeId>> {
        let p = self.panel_state(panel)?;
        p.pages
            .get(p.current_page)
            .and_then(|page| page.get(position))
            .ok_or_else(|| Error::NoItemAt {
                panel: self.path_of(panel),
                page: p.current_page,
                position,
            })
    }

    /// Position of `item` on the panel's current page.
    pub fn get_item_position(&self, panel: NodeId, item: NodeId) -> Result<usize> {
        let p = self.panel_state(panel)?;
        p.pages
            .get(p.current_page)
            .and_then(|page| page.position_of(item))
            .ok_or_else(|| Error::ItemNotOnPage {
                panel: self.path_of(panel),
                item: self.name(item).unwrap_or("?").to_string(),
            })
    }

    /// Slot at grid cell `(x, y)` on the panel's current page.
    pub fn get_item_by_2d_position(&self, panel: NodeId, x: usize, y: usize) -> Result<Slot<NodeId>> {
        match self.layout.index_of(x, y) {
            Some(i) => self.get_item(panel, i),
            None => Err(Error::NoItemAt {
                panel: self.path_of(panel),
                page: self.current_page(panel)?,
                position: y.saturating_mul(self.layout.cols()).saturating_add(x),
            }),
        }
    }

    // ---- tree mutation -----------------------------------------------------

    /// Insert a node under `parent` without repaginating.
    fn attach(&mut self, parent: NodeId, name: &str, path: Option<PathBuf>, kind: NodeKind) -> Result<NodeId> {
        let parent_name = {
            let p = self.panel_state(parent)?;
            let duplicate = p
                .children
                .iter()
                .any(|c| self.nodes.get(*c).is_some_and(|n| n.name == name));
            if duplicate {
                return Err(Error::DuplicateName {
                    panel: self.path_of(parent),
                    name: name.to_string(),
                });
            }
            self.path_of(parent)
        };
        let label = if parent_name == "/" {
            format!("/{name}")
        } else {
            format!("{parent_name}/{name}")
        };
        let subscriber = self.bus.register(label.as_str());
        let id = self.nodes.insert(Node {
            name: name.to_string(),
            path,
            parent: Some(parent),
            subscriber,
            kind,
        });
        if let Some(p) = self.nodes.get_mut(parent).and_then(Node::panel_mut) {
            p.children.push(id);
        }
        debug!(node = %label, "attached");
        Ok(id)
    }

    /// Add a button to `parent`. The parent is not repaginated.
    pub fn add_button(
        &mut self,
        parent: NodeId,
        name: &str,
        path: Option<PathBuf>,
        behavior: Box<dyn Behavior>,
    ) -> Result<NodeId> {
        self.attach(
            parent,
            name,
            path,
            NodeKind::Button(ButtonNode {
                pressed: false,
                behavior,
            }),
        )
    }

    /// Add a child panel to `parent`. Neither panel is repaginated.
    pub fn add_panel(
        &mut self,
        parent: NodeId,
        name: &str,
        path: Option<PathBuf>,
        behavior: Box<dyn PanelBehavior>,
    ) -> Result<NodeId> {
        let pages = paginate(&[], true, &self.layout);
        self.attach(
            parent,
            name,
            path,
            NodeKind::Panel(PanelNode {
                children: Vec::new(),
                pages,
                current_page: 0,
                active: false,
                pressed: false,
                look: PanelLook::default(),
                behavior,
            }),
        )
    }

    /// Replace a panel's appearance overrides.
    pub fn set_look(&mut self, panel: NodeId, look: PanelLook) -> Result<()> {
        let n = self.nodes.get_mut(panel).ok_or(Error::UnknownNode)?;
        let name = n.name.clone();
        let p = n.panel_mut().ok_or(Error::NotAPanel(name))?;
        p.look = look;
        Ok(())
    }

    /// Set the source path of a node (used for the root after loading).
    pub fn set_source_path(&mut self, id: NodeId, path: PathBuf) -> Result<()> {
        let n = self.nodes.get_mut(id).ok_or(Error::UnknownNode)?;
        n.path = Some(path);
        Ok(())
    }

    /// Recompute a panel's pages from its children.
    ///
    /// The current page is clamped to the new page count. An active panel
    /// is redrawn.
    pub fn repaginate(&mut self, panel: NodeId) -> Result<()> {
        let has_parent = self.has_parent(panel);
        let layout = self.layout;
        let n = self.nodes.get_mut(panel).ok_or(Error::UnknownNode)?;
        let name = n.name.clone();
        let p = n.panel_mut().ok_or(Error::NotAPanel(name.clone()))?;
        p.pages = paginate(&p.children, has_parent, &layout);
        p.current_page = p.current_page.min(p.pages.len() - 1);
        let active = p.active;
        debug!(panel = %name, pages = p.pages.len(), children = p.children.len(), "repaginated");
        for page in &p.pages {
            trace!(panel = %name, "{page}");
        }
        if active {
            self.render_panel(panel);
        }
        Ok(())
    }

    /// Remove a subtree.
    ///
    /// The former parent is repaginated. If the active panel lived inside the
    /// subtree, the former parent becomes active and is redrawn. Returns the
    /// number of nodes removed.
    pub fn detach(&mut self, id: NodeId) -> Result<usize> {
        if id == self.root {
            return Err(Error::DetachRoot);
        }
        let parent = self.parent(id).ok_or(Error::UnknownNode)?;

        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            doomed.extend_from_slice(self.children(doomed[i]));
            i += 1;
        }
        let active_removed = doomed.contains(&self.active);
        info!(node = %self.path_of(id), nodes = doomed.len(), active_removed, "detaching");

        if active_removed {
            self.set_active(parent);
        }
        if let Some(p) = self.nodes.get_mut(parent).and_then(Node::panel_mut) {
            p.children.retain(|c| *c != id);
        }
        for d in &doomed {
            if let Some(n) = self.nodes.remove(*d) {
                self.bus.deregister(n.subscriber);
            }
        }
        self.repaginate(parent)?;
        Ok(doomed.len())
    }

    /// Remove the subtree at a tree path.
    pub fn detach_path(&mut self, path: &str) -> Result<usize> {
        let id = self
            .find(path)
            .ok_or_else(|| Error::UnknownPath(path.to_string()))?;
        self.detach(id)
    }

    // ---- activation & navigation -------------------------------------------

    /// Move the active flag to `panel`, firing deactivate/activate hooks.
    /// Does not draw.
    fn set_active(&mut self, panel: NodeId) {
        let prev = self.active;
        if prev != panel
            && let Some(n) = self.nodes.get_mut(prev)
            && let NodeKind::Panel(p) = &mut n.kind
            && p.active
        {
            p.active = false;
            let c = ctx(&n.name, n.path.as_deref(), n.subscriber, None, &self.outbox);
            p.behavior.deactivated(&c);
            debug!(panel = %n.name, "deactivated");
            self.notify(Topic::PanelDeactivated, Payload::Panel { path: self.path_of(prev) });
        }
        if let Some(n) = self.nodes.get_mut(panel)
            && let NodeKind::Panel(p) = &mut n.kind
        {
            self.active = panel;
            if !p.active {
                p.active = true;
                let c = ctx(&n.name, n.path.as_deref(), n.subscriber, None, &self.outbox);
                p.behavior.activated(&c);
                debug!(panel = %n.name, "activated");
                self.notify(Topic::PanelActivated, Payload::Panel { path: self.path_of(panel) });
            }
        }
    }

    /// Make `panel` the active panel and draw its current page.
    pub fn activate(&mut self, panel: NodeId) -> Result<()> {
        self.panel_state(panel)?;
        self.set_active(panel);
        self.render_panel(panel);
        Ok(())
    }

    /// Activate the panel at a tree path.
    pub fn activate_path(&mut self, path: &str) -> Result<()> {
        let id = self
            .find(path)
            .ok_or_else(|| Error::UnknownPath(path.to_string()))?;
        self.activate(id)
    }

    /// Hand control from `panel` to its parent. No-op without a parent.
    pub fn go_to_parent_of(&mut self, panel: NodeId) -> bool {
        let Some(parent) = self.parent(panel) else {
            return false;
        };
        self.set_active(parent);
        self.render_panel(parent);
        true
    }

    /// Hand control from the active panel to its parent.
    pub fn go_to_parent(&mut self) -> bool {
        self.go_to_parent_of(self.active)
    }

    /// Move a panel by `delta` pages if the target page exists.
    fn shift_page(&mut self, panel: NodeId, forward: bool) -> bool {
        let Some(n) = self.nodes.get_mut(panel) else {
            return false;
        };
        let NodeKind::Panel(p) = &mut n.kind else {
            return false;
        };
        let from = p.current_page;
        let to = if forward {
            if from + 1 >= p.pages.len() {
                return false;
            }
            from + 1
        } else {
            let Some(to) = from.checked_sub(1) else {
                return false;
            };
            to
        };
        p.current_page = to;
        let c = ctx(&n.name, n.path.as_deref(), n.subscriber, None, &self.outbox);
        p.behavior.page_changed(&c, from, to);
        debug!(panel = %n.name, from, to, "page changed");
        let active = p.active;
        self.notify(Topic::PanelPageChanged, Payload::PageChange { from, to });
        if active {
            self.render_panel(panel);
        }
        true
    }

    /// Advance a panel one page. No-op on the last page.
    pub fn next_page_of(&mut self, panel: NodeId) -> bool {
        self.shift_page(panel, true)
    }

    /// Go back one page. No-op on the first page.
    pub fn previous_page_of(&mut self, panel: NodeId) -> bool {
        self.shift_page(panel, false)
    }

    /// Advance the active panel one page.
    pub fn next_page(&mut self) -> bool {
        self.next_page_of(self.active)
    }

    /// Go back one page on the active panel.
    pub fn previous_page(&mut self) -> bool {
        self.previous_page_of(self.active)
    }

    // ---- rendering -------------------------------------------------------------

    /// Describe a navigation slot of `panel`.
    fn navigation_display(&self, panel: NodeId, slot: Slot<NodeId>, pressed: bool) -> Option<DisplayDescriptor> {
        let look = &self.panel_state(panel).ok()?.look;
        let d = match slot {
            Slot::Parent => look.parent.display("", icons::PARENT, icons::PARENT_PRESSED, pressed),
            Slot::NextPage => look
                .next_page
                .display("", icons::NEXT_PAGE, icons::NEXT_PAGE_PRESSED, pressed),
            Slot::PreviousPage => look.previous_page.display(
                "",
                icons::PREVIOUS_PAGE,
                icons::PREVIOUS_PAGE_PRESSED,
                pressed,
            ),
            Slot::Item(_) => return None,
        };
        Some(d)
    }

    /// Ask an item for its resting appearance.
    fn item_display(&mut self, id: NodeId) -> Option<DisplayDescriptor> {
        let n = self.nodes.get_mut(id)?;
        let c = ctx(&n.name, n.path.as_deref(), n.subscriber, None, &self.outbox);
        match &mut n.kind {
            NodeKind::Button(b) => b.behavior.render(&c),
            NodeKind::Panel(p) => Some(p.look.own.display(&n.name, icons::PANEL, icons::PANEL_PRESSED, false)),
        }
    }

    /// Clear the deck and draw the panel's current page.
    pub fn render_panel(&mut self, panel: NodeId) {
        let Ok(p) = self.panel_state(panel) else {
            warn!("render of unknown panel");
            return;
        };
        let Some(page) = p.pages.get(p.current_page) else {
            return;
        };
        let slots: Vec<Slot<NodeId>> = page.slots().to_vec();
        let page_number = p.current_page;
        debug!(panel = %self.path_of(panel), page = page_number, keys = slots.len(), "render panel");
        self.renderer.clear_deck();
        for (key, slot) in slots.into_iter().enumerate() {
            let display = match slot {
                Slot::Item(id) => {
                    let d = self.item_display(id);
                    self.notify_node(id, Topic::ItemRendered, Payload::Key { key });
                    d
                }
                nav => self.navigation_display(panel, nav, false),
            };
            if let Some(d) = display {
                trace!(key, display = %d, "render key");
                self.renderer.render_key(key, &d);
            }
        }
        self.notify(Topic::PanelRendered, Payload::Panel { path: self.path_of(panel) });
    }

    /// Redraw the active panel.
    pub fn render(&mut self) {
        self.render_panel(self.active);
    }

    // ---- key routing -------------------------------------------------------

    /// Route a device key transition to the active panel.
    ///
    /// Lookup failures are logged and otherwise ignored.
    pub fn key_change(&mut self, key: usize, pressed: bool) {
        self.notify(Topic::KeyChanged, Payload::KeyChange { key, pressed });
        let panel = self.active;
        if pressed {
            self.key_pressed(panel, key);
        } else {
            self.key_released(panel, key);
        }
    }

    /// A key went down on `panel`.
    fn key_pressed(&mut self, panel: NodeId, key: usize) {
        let slot = match self.get_item(panel, key) {
            Ok(s) => s,
            Err(e) => {
                debug!(key, error = %e, "key press ignored");
                return;
            }
        };
        self.notify_node(panel, Topic::KeyPressed, Payload::Key { key });
        let display = match slot {
            Slot::Item(id) => self.press_item(id, key),
            nav => self.navigation_display(panel, nav, true),
        };
        if let Some(d) = display {
            self.renderer.render_key(key, &d);
        }
    }

    /// A key came up on `panel`.
    fn key_released(&mut self, panel: NodeId, key: usize) {
        let slot = match self.get_item(panel, key) {
            Ok(s) => s,
            Err(e) => {
                debug!(key, error = %e, "key release ignored");
                return;
            }
        };
        self.notify_node(panel, Topic::KeyReleased, Payload::Key { key });
        match slot {
            Slot::Parent => {
                self.notify_node(panel, Topic::PanelParent, Payload::Empty);
                self.go_to_parent_of(panel);
            }
            Slot::NextPage => {
                self.notify_node(panel, Topic::PanelNextPage, Payload::Empty);
                self.next_page_of(panel);
            }
            Slot::PreviousPage => {
                self.notify_node(panel, Topic::PanelPreviousPage, Payload::Empty);
                self.previous_page_of(panel);
            }
            Slot::Item(id) => {
                if let Some(d) = self.release_item(id, key) {
                    self.renderer.render_key(key, &d);
                }
                if self.is_panel(id) {
                    self.set_active(id);
                    self.render_panel(id);
                }
            }
        }
    }

    /// Press an item; returns what to draw on its key.
    fn press_item(&mut self, id: NodeId, key: usize) -> Option<DisplayDescriptor> {
        let n = self.nodes.get_mut(id)?;
        let c = ctx(&n.name, n.path.as_deref(), n.subscriber, Some(key), &self.outbox);
        let d = match &mut n.kind {
            NodeKind::Button(b) => {
                b.pressed = true;
                b.behavior.press(&c)
            }
            NodeKind::Panel(p) => {
                p.pressed = true;
                Some(p.look.own.display(&n.name, icons::PANEL, icons::PANEL_PRESSED, true))
            }
        };
        trace!(item = %n.name, key, "pressed");
        self.outbox
            .push(Notification::Send(n.subscriber, Topic::ItemPressed, Payload::Key { key }));
        d
    }

    /// Release an item; returns what to draw on its key. Panels return
    /// nothing since they are about to take over the deck.
    fn release_item(&mut self, id: NodeId, key: usize) -> Option<DisplayDescriptor> {
        let n = self.nodes.get_mut(id)?;
        let c = ctx(&n.name, n.path.as_deref(), n.subscriber, Some(key), &self.outbox);
        let d = match &mut n.kind {
            NodeKind::Button(b) => {
                b.pressed = false;
                b.behavior.release(&c)
            }
            NodeKind::Panel(p) => {
                p.pressed = false;
                None
            }
        };
        trace!(item = %n.name, key, "released");
        self.outbox
            .push(Notification::Send(n.subscriber, Topic::ItemReleased, Payload::Key { key }));
        d
    }

    // ---- ticks & dispatch --------------------------------------------------

    /// Visible tick: items on the active panel's current page may redraw.
    pub fn tick(&mut self, index: u64, count: u64) {
        let panel = self.active;
        let slots: Vec<Slot<NodeId>> = match self.panel_state(panel) {
            Ok(p) => p
                .pages
                .get(p.current_page)
                .map(|pg| pg.slots().to_vec())
                .unwrap_or_default(),
            Err(_) => return,
        };
        for (key, slot) in slots.into_iter().enumerate() {
            let Slot::Item(id) = slot else { continue };
            let Some(n) = self.nodes.get_mut(id) else {
                continue;
            };
            let NodeKind::Button(b) = &mut n.kind else {
                continue;
            };
            let c = ctx(&n.name, n.path.as_deref(), n.subscriber, Some(key), &self.outbox);
            if let Some(d) = b.behavior.tick(&c, index, count) {
                trace!(key, display = %d, "tick redraw");
                self.renderer.render_key(key, &d);
            }
        }
    }

    /// Hidden tick: every item in the tree, visible or not.
    pub fn hidden_tick(&mut self, index: u64, count: u64) {
        for n in self.nodes.values_mut() {
            let c = ctx(&n.name, n.path.as_deref(), n.subscriber, None, &self.outbox);
            match &mut n.kind {
                NodeKind::Button(b) => b.behavior.hidden_tick(&c, index, count),
                NodeKind::Panel(p) => p.behavior.hidden_tick(&c, index, count),
            }
        }
    }

    /// Deliver `data` from `source` to every child of `panel`.
    pub fn dispatch(&mut self, panel: NodeId, source: &str, data: &Value) -> Result<()> {
        let children = self.panel_state(panel)?.children.clone();
        for id in children {
            let Some(n) = self.nodes.get_mut(id) else {
                continue;
            };
            let c = ctx(&n.name, n.path.as_deref(), n.subscriber, None, &self.outbox);
            match &mut n.kind {
                NodeKind::Button(b) => b.behavior.dispatch(&c, source, data),
                NodeKind::Panel(p) => p.behavior.dispatch(&c, source, data),
            }
        }
        Ok(())
    }

    // ---- printing ----------------------------------------------------------

    /// Indented text rendering of the tree.
    pub fn structure(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root, 0);
        out
    }

    /// Append one node and its descendants.
    fn write_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let Some(n) = self.nodes.get(id) else { return };
        let indent = "  ".repeat(depth);
        match &n.kind {
            NodeKind::Panel(p) => {
                let marker = if p.active { " *" } else { "" };
                let _ = writeln!(
                    out,
                    "{indent}[{}] ({} page{}){marker}",
                    n.name,
                    p.pages.len(),
                    if p.pages.len() == 1 { "" } else { "s" }
                );
                for c in &p.children {
                    self.write_node(out, *c, depth + 1);
                }
            }
            NodeKind::Button(_) => {
                let _ = writeln!(out, "{indent}{}", n.name);
            }
        }
    }
}

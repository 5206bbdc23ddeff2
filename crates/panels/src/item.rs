//! Item behaviours and the context they run in.
use std::{mem, path::Path};

use deck_protocol::{DisplayDescriptor, Margins, icons};
use eventbus::{EventBus, Payload, SubscriberId, Topic};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

/// A bus delivery queued while the tree is being mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Fan out to every subscriber of the topic.
    Publish(Topic, Payload),
    /// Deliver to one recipient.
    Send(SubscriberId, Topic, Payload),
}

impl Notification {
    /// Deliver on `bus`.
    pub fn deliver(self, bus: &EventBus) {
        match self {
            Self::Publish(topic, payload) => {
                bus.publish(&topic, &payload);
            }
            Self::Send(to, topic, payload) => {
                let _reply = bus.send_event(to, &topic, &payload);
            }
        }
    }

    /// Topic of this notification.
    pub fn topic(&self) -> &Topic {
        match self {
            Self::Publish(t, _) | Self::Send(_, t, _) => t,
        }
    }
}

/// Pending notifications.
///
/// Behaviours run while the tree is borrowed, so anything they want to say on
/// the bus is queued here and delivered once the tree is released.
#[derive(Debug, Default)]
pub struct Outbox {
    /// Queued notifications in order.
    queue: Mutex<Vec<Notification>>,
}

impl Outbox {
    /// Queue a notification.
    pub fn push(&self, n: Notification) {
        self.queue.lock().push(n);
    }

    /// Take everything queued so far.
    pub fn drain(&self) -> Vec<Notification> {
        mem::take(&mut *self.queue.lock())
    }

    /// Number of queued notifications.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// What a behaviour knows about the node it is attached to.
pub struct ItemCtx<'a> {
    /// Item name.
    pub name: &'a str,
    /// Declarative source directory or file.
    pub path: Option<&'a Path>,
    /// The node's bus identity.
    pub id: SubscriberId,
    /// Key position for press/release, when known.
    pub key: Option<usize>,
    /// Outgoing notifications.
    pub(crate) outbox: &'a Outbox,
}

impl ItemCtx<'_> {
    /// Publish on the bus once the current dispatch completes.
    pub fn publish(&self, topic: Topic, payload: Payload) {
        self.outbox.push(Notification::Publish(topic, payload));
    }

    /// Address a recipient on the bus once the current dispatch completes.
    pub fn send(&self, to: SubscriberId, topic: Topic, payload: Payload) {
        self.outbox.push(Notification::Send(to, topic, payload));
    }

    /// Resolve an icon reference against the item's own path.
    pub fn icon(&self, name: &str) -> String {
        resolve_icon(self.path, name)
    }
}

/// Resolve `name` to a file under `base` when one exists, else keep it as an
/// asset name.
pub fn resolve_icon(base: Option<&Path>, name: &str) -> String {
    let dir = match base {
        Some(p) if p.is_dir() => p,
        Some(p) => p.parent().unwrap_or(p),
        None => return name.to_string(),
    };
    let candidate = dir.join(name);
    if candidate.is_file() {
        candidate.display().to_string()
    } else {
        name.to_string()
    }
}

/// Domain logic for a button.
///
/// Each hook returns the descriptor to draw on the item's key, or `None`
/// to leave it untouched.
pub trait Behavior: Send {
    /// Describe the key at rest.
    fn render(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(DisplayDescriptor::new(ctx.name).with_icon(icons::DEFAULT))
    }

    /// The key went down.
    fn press(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(DisplayDescriptor::new(ctx.name).with_icon(icons::DEFAULT_PRESSED))
    }

    /// The key came up.
    fn release(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        self.render(ctx)
    }

    /// Visible periodic tick; only called while the item is on screen.
    fn tick(&mut self, _ctx: &ItemCtx<'_>, _index: u64, _count: u64) -> Option<DisplayDescriptor> {
        None
    }

    /// Hidden periodic tick; called whether or not the item is on screen.
    fn hidden_tick(&mut self, _ctx: &ItemCtx<'_>, _index: u64, _count: u64) {}

    /// Free-form data dispatched by the parent panel.
    fn dispatch(&mut self, _ctx: &ItemCtx<'_>, _source: &str, _data: &Value) {}
}

/// Domain logic attached to a panel.
pub trait PanelBehavior: Send {
    /// The panel became the active panel.
    fn activated(&mut self, _ctx: &ItemCtx<'_>) {}

    /// The panel stopped being the active panel.
    fn deactivated(&mut self, _ctx: &ItemCtx<'_>) {}

    /// The panel switched pages.
    fn page_changed(&mut self, _ctx: &ItemCtx<'_>, _from: usize, _to: usize) {}

    /// Hidden periodic tick.
    fn hidden_tick(&mut self, _ctx: &ItemCtx<'_>, _index: u64, _count: u64) {}

    /// Free-form data dispatched by the parent panel.
    fn dispatch(&mut self, _ctx: &ItemCtx<'_>, _source: &str, _data: &Value) {}
}

/// Panel with no behaviour beyond navigation.
#[derive(Debug, Default)]
pub struct PlainPanel;

impl PanelBehavior for PlainPanel {}

/// Appearance override for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Look {
    /// Icon at rest.
    #[serde(default)]
    pub icon: Option<String>,
    /// Icon while pressed.
    #[serde(default)]
    pub icon_pressed: Option<String>,
    /// Caption.
    #[serde(default)]
    pub label: Option<String>,
    /// Icon margins.
    #[serde(default)]
    pub margins: Option<Margins>,
}

impl Look {
    /// Build a descriptor, falling back to the given caption and icons.
    pub fn display(&self, text: &str, icon: &str, icon_pressed: &str, pressed: bool) -> DisplayDescriptor {
        let icon = if pressed {
            self.icon_pressed.as_deref().unwrap_or(icon_pressed)
        } else {
            self.icon.as_deref().unwrap_or(icon)
        };
        let mut d = DisplayDescriptor::new(self.label.as_deref().unwrap_or(text)).with_icon(icon);
        if let Some(m) = self.margins {
            d = d.with_margins(m);
        }
        d
    }

    /// Rewrite icon references that name files under `dir`.
    pub fn resolve(&mut self, dir: &Path) {
        for icon in [&mut self.icon, &mut self.icon_pressed].into_iter().flatten() {
            *icon = resolve_icon(Some(dir), icon);
        }
    }
}

/// Appearance of a panel and its synthesized navigation keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PanelLook {
    /// The panel shown as a key in its parent.
    #[serde(flatten)]
    pub own: Look,
    /// Parent navigation key.
    #[serde(default)]
    pub parent: Look,
    /// Next page key.
    #[serde(default)]
    pub next_page: Look,
    /// Previous page key.
    #[serde(default)]
    pub previous_page: Look,
}

impl PanelLook {
    /// Rewrite file icon references relative to `dir`.
    pub fn resolve(&mut self, dir: &Path) {
        for look in [
            &mut self.own,
            &mut self.parent,
            &mut self.next_page,
            &mut self.previous_page,
        ] {
            look.resolve(dir);
        }
    }
}

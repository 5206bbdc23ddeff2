//! Panel tree and key dispatch.
//!
//! A [`Registry`] owns an arena of buttons and panels rooted at a single
//! root panel. Each panel lays its children out into fixed-size pages with
//! [`paginate`], injecting parent/previous/next navigation keys. Exactly one
//! panel is active at a time; device key transitions are routed to it and
//! the resulting [`deck_protocol::DisplayDescriptor`]s are drawn through a
//! [`deck_protocol::Renderer`].
mod builtin;
mod catalog;
mod error;
mod item;
mod load;
mod page;
mod registry;

pub use builtin::{Countdown, CountdownParams, Face, Label, Launch, LaunchParams, Toggle, ToggleParams, format_mmss};
pub use catalog::{ButtonFactory, Catalog, DEFAULT_BUTTON, DEFAULT_PANEL, ItemSpec, PanelFactory};
pub use error::{Error, Result};
pub use item::{Behavior, ItemCtx, Look, Notification, Outbox, PanelBehavior, PanelLook, PlainPanel, resolve_icon};
pub use load::{EntryKind, ITEMS_FILE, ItemDecl, ItemsFile};
pub use page::{Layout, MIN_CAPACITY, Page, Slot, paginate};
pub use registry::{NodeId, ROOT_NAME, Registry};

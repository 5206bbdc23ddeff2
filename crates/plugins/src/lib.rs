//! Plugin discovery and lifecycle.
//!
//! Each directory under the plugin root holding a `plugin.toml` is one
//! plugin. Its `entry_point` names a factory in a [`PluginCatalog`]; the
//! [`PluginManager`] builds the plugin, mounts the panels it declares into
//! the [`panels::Registry`] and subscribes its hooks on the bus. A plugin
//! that fails at any step leaves the tree as if it had never been loaded.
mod error;
mod manager;
mod manifest;
mod plugin;

pub use error::{Error, Result};
pub use manager::{Discovery, LoadedPlugin, PluginManager, discover};
pub use manifest::{DEFAULT_MOUNT, DEFAULT_VERSION, HookDecl, MANIFEST_FILE, PanelDecl, PluginManifest};
pub use plugin::{DECLARATIVE, Declarative, Plugin, PluginCatalog, PluginContext, PluginFactory};

//! Plugin contract and the entry-point catalog.
use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc};

use deck_device::Device;
use eventbus::{EventBus, Handler, Payload, Reply, SubscriberId};
use panels::{Catalog, Registry};
use serde_json::{Map, Value};
use tracing::info;

use crate::PluginManifest;

/// What a plugin is built with.
#[derive(Clone)]
pub struct PluginContext {
    /// Parsed manifest.
    pub manifest: PluginManifest,
    /// The plugin's directory.
    pub base_path: PathBuf,
    /// Shared bus.
    pub bus: EventBus,
    /// The plugin's bus identity; hooks are subscribed under it.
    pub subscriber: SubscriberId,
    /// The selected deck, when one is open.
    pub device: Option<Arc<dyn Device>>,
    /// Application-wide configuration.
    pub global_config: Value,
}

impl PluginContext {
    /// The plugin's own `[config]` table.
    pub fn config(&self) -> &Map<String, Value> {
        &self.manifest.config
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin", &self.manifest.name)
            .field("base_path", &self.base_path)
            .field("subscriber", &self.subscriber)
            .field("device", &self.device.as_ref().map(|d| d.id()))
            .finish()
    }
}

/// A loaded plugin.
///
/// The lifecycle manager calls [`Plugin::provide`] before mounting the
/// declared panels, [`Plugin::register`] after, then resolves each declared
/// hook through [`Plugin::handler`].
pub trait Plugin: Send {
    /// Add item types the plugin's panels refer to.
    fn provide(&self, _catalog: &mut Catalog) {}

    /// Finish setup once the declared panels are mounted.
    fn register(&mut self, ctx: &PluginContext, registry: &mut Registry) -> Result<(), String>;

    /// Resolve a handler named in the manifest.
    fn handler(&self, _name: &str) -> Option<Handler> {
        None
    }

    /// Called when the plugin is unloaded.
    fn shutdown(&mut self) {}
}

/// Builds a plugin from its context.
pub type PluginFactory =
    Arc<dyn Fn(&PluginContext) -> Result<Box<dyn Plugin>, String> + Send + Sync>;

/// Entry point of the built-in declarative plugin.
pub const DECLARATIVE: &str = "builtin:Declarative";

/// Maps `module:Name` entry points to factories.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    /// Factories by entry point.
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut c = Self::new();
        c.register(DECLARATIVE, |ctx| Ok(Box::new(Declarative::new(ctx))));
        c
    }

    /// Add or replace a factory.
    pub fn register<F>(&mut self, entry_point: impl Into<String>, factory: F)
    where
        F: Fn(&PluginContext) -> Result<Box<dyn Plugin>, String> + Send + Sync + 'static,
    {
        self.factories.insert(entry_point.into(), Arc::new(factory));
    }

    /// Factory for an entry point.
    pub fn get(&self, entry_point: &str) -> Option<&PluginFactory> {
        self.factories.get(entry_point)
    }

    /// Registered entry points.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Plugin whose behaviour lives entirely in its manifest.
///
/// Provides one hook, `log_event`, which logs the payload it receives.
pub struct Declarative {
    /// Plugin name.
    name: String,
}

impl Declarative {
    /// Build from the context.
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            name: ctx.manifest.name.clone(),
        }
    }
}

impl Plugin for Declarative {
    fn register(&mut self, ctx: &PluginContext, _registry: &mut Registry) -> Result<(), String> {
        info!(plugin = %self.name, panels = ctx.manifest.panels.len(), "registered");
        Ok(())
    }

    fn handler(&self, name: &str) -> Option<Handler> {
        match name {
            "log_event" => {
                let plugin = self.name.clone();
                let h: Handler = Arc::new(move |p: &Payload| -> Reply {
                    info!(plugin = %plugin, payload = ?p, "event");
                    None
                });
                Some(h)
            }
            _ => None,
        }
    }
}

//! Plugin discovery and lifecycle.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use deck_device::Device;
use eventbus::SubscriberId;
use panels::{DEFAULT_PANEL, ItemSpec, NodeId, Registry};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    Error, MANIFEST_FILE, Plugin, PluginCatalog, PluginContext, PluginFactory, PluginManifest, Result,
};

/// Result of scanning a plugin root without loading anything.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Directories holding a manifest, with the parse outcome.
    pub found: Vec<(PathBuf, Result<PluginManifest>)>,
    /// Directories without a manifest.
    pub skipped: Vec<PathBuf>,
}

/// Scan `root` for plugin directories, in name order.
pub fn discover(root: &Path) -> Result<Discovery> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    let mut out = Discovery::default();
    for dir in dirs {
        if dir.join(MANIFEST_FILE).is_file() {
            let manifest = PluginManifest::read(&dir).and_then(|m| m.ok_or_else(|| missing(&dir)));
            out.found.push((dir, manifest));
        } else {
            out.skipped.push(dir);
        }
    }
    Ok(out)
}

/// Error for a directory without a manifest.
fn missing(dir: &Path) -> Error {
    Error::Manifest {
        path: dir.join(MANIFEST_FILE),
        message: "file not found".into(),
    }
}

/// A plugin that loaded successfully.
pub struct LoadedPlugin {
    /// Parsed manifest.
    manifest: PluginManifest,
    /// Plugin directory.
    dir: PathBuf,
    /// Bus identity its hooks are subscribed under.
    subscriber: SubscriberId,
    /// Panels it mounted, in declaration order.
    panels: Vec<NodeId>,
    /// The instance.
    plugin: Box<dyn Plugin>,
}

impl LoadedPlugin {
    /// Plugin name.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Parsed manifest.
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Plugin directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bus identity.
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// Mounted panels.
    pub fn panels(&self) -> &[NodeId] {
        &self.panels
    }
}

/// Discovers plugins, mounts their panels and wires their hooks.
pub struct PluginManager {
    /// Directory scanned for plugins.
    root: PathBuf,
    /// Entry-point factories.
    catalog: PluginCatalog,
    /// Configuration handed to every plugin.
    global_config: Value,
    /// Selected deck, if any.
    device: Option<Arc<dyn Device>>,
    /// Loaded plugins in load order.
    plugins: Vec<LoadedPlugin>,
}

impl PluginManager {
    /// Manage plugins under `root`.
    pub fn new(root: impl Into<PathBuf>, catalog: PluginCatalog, global_config: Value) -> Self {
        Self {
            root: root.into(),
            catalog,
            global_config,
            device: None,
            plugins: Vec::new(),
        }
    }

    /// Hand the selected deck to plugins.
    pub fn with_device(mut self, device: Arc<dyn Device>) -> Self {
        self.device = Some(device);
        self
    }

    /// Entry-point factories, for registering compiled-in plugins.
    pub fn catalog_mut(&mut self) -> &mut PluginCatalog {
        &mut self.catalog
    }

    /// Loaded plugins in load order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Load every plugin under the root. Failures are logged and skip only
    /// the failing plugin. Returns the number loaded.
    ///
    /// Loading and unloading deliver the registry's queued notifications
    /// before returning, so the caller must not hold a lock that bus
    /// handlers take.
    pub fn discover_and_load(&mut self, registry: &mut Registry) -> usize {
        if !self.root.is_dir() {
            warn!(dir = %self.root.display(), "plugin directory does not exist");
            return 0;
        }
        let found = match discover(&self.root) {
            Ok(d) => d,
            Err(e) => {
                error!(dir = %self.root.display(), error = %e, "plugin scan failed");
                return 0;
            }
        };
        for dir in &found.skipped {
            warn!(dir = %dir.display(), "ignoring directory without {MANIFEST_FILE}");
        }
        let mut loaded = 0;
        for (dir, manifest) in found.found {
            let outcome = manifest.and_then(|m| self.load(m, &dir, registry));
            match outcome {
                Ok(()) => loaded += 1,
                Err(e) => error!(dir = %dir.display(), error = %e, "failed to load plugin"),
            }
        }
        loaded
    }

    /// Load the plugin in `dir`.
    pub fn load_dir(&mut self, dir: &Path, registry: &mut Registry) -> Result<()> {
        let manifest = PluginManifest::read(dir)?.ok_or_else(|| missing(dir))?;
        self.load(manifest, dir, registry)
    }

    /// Instantiate, mount, register and wire one plugin.
    ///
    /// On failure everything done so far is undone: mounted panels are
    /// detached, item types the plugin provided are withdrawn and the bus
    /// identity is released.
    fn load(&mut self, manifest: PluginManifest, dir: &Path, registry: &mut Registry) -> Result<()> {
        manifest.entry_point_parts()?;
        let factory = self
            .catalog
            .get(&manifest.entry_point)
            .cloned()
            .ok_or_else(|| Error::UnknownEntryPoint(manifest.entry_point.clone()))?;

        let bus = registry.bus().clone();
        let subscriber = bus.register(format!("plugin:{}", manifest.name));
        let ctx = PluginContext {
            manifest,
            base_path: dir.to_path_buf(),
            bus: bus.clone(),
            subscriber,
            device: self.device.clone(),
            global_config: self.global_config.clone(),
        };

        let catalog = registry.catalog().clone();
        let mut mounted = Vec::new();
        let result = build(&factory, &ctx, registry, &mut mounted);
        let plugin = match result {
            Ok(p) => p,
            Err(e) => {
                for id in mounted.iter().rev() {
                    if let Err(de) = registry.detach(*id) {
                        warn!(error = %de, "rollback detach failed");
                    }
                }
                *registry.catalog_mut() = catalog;
                bus.deregister(subscriber);
                registry.flush();
                return Err(e);
            }
        };

        for hook in &ctx.manifest.events {
            match plugin.handler(&hook.handler) {
                Some(h) => {
                    bus.subscribe_handler(subscriber, hook.topic.clone(), h, hook.once);
                    debug!(plugin = %ctx.manifest.name, topic = %hook.topic, handler = %hook.handler, once = hook.once, "hook wired");
                }
                None => warn!(
                    plugin = %ctx.manifest.name,
                    handler = %hook.handler,
                    "handler not found"
                ),
            }
        }

        registry.flush();
        info!(plugin = %ctx.manifest.name, version = %ctx.manifest.version, dir = %dir.display(), "loaded plugin");
        self.plugins.push(LoadedPlugin {
            manifest: ctx.manifest,
            dir: ctx.base_path,
            subscriber,
            panels: mounted,
            plugin,
        });
        Ok(())
    }

    /// Unload a plugin: shut it down, detach its panels and drop its hooks.
    /// Returns the number of tree nodes removed.
    pub fn unload(&mut self, name: &str, registry: &mut Registry) -> Result<usize> {
        let idx = self
            .plugins
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))?;
        let mut p = self.plugins.remove(idx);
        p.plugin.shutdown();
        let mut removed = 0;
        for id in p.panels.iter().rev() {
            if registry.contains(*id) {
                removed += registry.detach(*id)?;
            }
        }
        registry.bus().deregister(p.subscriber);
        registry.flush();
        info!(plugin = %name, removed, "unloaded plugin");
        Ok(removed)
    }

    /// Unload every plugin, most recent first.
    pub fn unload_all(&mut self, registry: &mut Registry) {
        while let Some(name) = self.plugins.last().map(|p| p.name().to_string()) {
            if let Err(e) = self.unload(&name, registry) {
                warn!(plugin = %name, error = %e, "unload failed");
            }
        }
    }
}

/// Instantiate the plugin, mount its panels and run `register`.
fn build(
    factory: &PluginFactory,
    ctx: &PluginContext,
    registry: &mut Registry,
    mounted: &mut Vec<NodeId>,
) -> Result<Box<dyn Plugin>> {
    let mut plugin = factory(ctx).map_err(|message| Error::Instantiate {
        plugin: ctx.manifest.name.clone(),
        message,
    })?;
    plugin.provide(registry.catalog_mut());
    mount_panels(ctx, registry, mounted)?;
    plugin
        .register(ctx, registry)
        .map_err(|message| Error::Register {
            plugin: ctx.manifest.name.clone(),
            message,
        })?;
    Ok(plugin)
}

/// Attach every declared panel. Successfully attached ids are pushed to
/// `mounted` as they go so the caller can roll back.
fn mount_panels(ctx: &PluginContext, registry: &mut Registry, mounted: &mut Vec<NodeId>) -> Result<()> {
    for decl in &ctx.manifest.panels {
        let target = registry
            .find(&decl.mount)
            .filter(|t| registry.is_panel(*t))
            .ok_or_else(|| Error::MountTargetMissing {
                panel: decl.id.clone(),
                mount: decl.mount.clone(),
            })?;
        let path = ctx.base_path.join(&decl.path);
        if !path.is_dir() {
            return Err(Error::PanelPathMissing(path));
        }
        let class = decl.class.as_deref().unwrap_or(DEFAULT_PANEL);
        let behavior = registry.catalog().panel(
            class,
            &ItemSpec {
                name: &decl.name,
                path: Some(&path),
                params: &decl.params,
            },
        )?;
        let id = registry.add_panel(target, &decl.name, Some(path.clone()), behavior)?;
        mounted.push(id);
        registry.load_dir(id, &path)?;
        registry.repaginate(target)?;
        info!(
            plugin = %ctx.manifest.name,
            panel = %registry.path_of(id),
            "mounted panel"
        );
    }
    Ok(())
}

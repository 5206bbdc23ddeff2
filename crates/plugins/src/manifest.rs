//! `plugin.toml` manifests.
//!
//! ```toml
//! name = "pomodoro"
//! version = "1.2.0"
//! entry_point = "builtin:Declarative"
//! description = "Focus timer"
//!
//! [[panels]]
//! id = "pomodoro"
//! path = "panel"
//! mount = "root"
//!
//! [[events]]
//! topic = "panel_activated"
//! handler = "log_event"
//! once = true
//!
//! [config]
//! minutes = 25
//! ```
use std::{
    fs,
    path::{Path, PathBuf},
};

use eventbus::Topic;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// File name of a plugin manifest.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Version assumed when a manifest omits one.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Mount path used when a panel declaration omits one.
pub const DEFAULT_MOUNT: &str = "root";

/// A panel contributed by a plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDecl {
    /// Identifier, defaults to the name.
    pub id: String,
    /// Node name in the tree, defaults to the identifier.
    pub name: String,
    /// Directory relative to the plugin directory.
    pub path: PathBuf,
    /// Tree path of the panel to attach under.
    pub mount: String,
    /// Catalog panel type; the plain panel when absent.
    pub class: Option<String>,
    /// Constructor parameters.
    pub params: Map<String, Value>,
}

/// A bus subscription bound to a named plugin handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HookDecl {
    /// Topic to subscribe to.
    pub topic: Topic,
    /// Handler name resolved on the plugin.
    pub handler: String,
    /// Remove the subscription after its first delivery.
    pub once: bool,
}

/// Parsed `plugin.toml`.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    /// Plugin name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// `module:Name` reference into the plugin catalog.
    pub entry_point: String,
    /// One-line description.
    pub description: Option<String>,
    /// Declared panels, mounted in order.
    pub panels: Vec<PanelDecl>,
    /// Declared event hooks.
    pub events: Vec<HookDecl>,
    /// Free-form plugin configuration.
    pub config: Map<String, Value>,
}

/// On-disk shape before defaults are applied.
#[derive(Deserialize)]
struct RawManifest {
    /// See [`PluginManifest::name`].
    name: String,
    /// See [`PluginManifest::version`].
    #[serde(default)]
    version: Option<String>,
    /// See [`PluginManifest::entry_point`].
    entry_point: String,
    /// See [`PluginManifest::description`].
    #[serde(default)]
    description: Option<String>,
    /// See [`PluginManifest::panels`].
    #[serde(default)]
    panels: Vec<RawPanel>,
    /// See [`PluginManifest::events`].
    #[serde(default)]
    events: Vec<RawHook>,
    /// See [`PluginManifest::config`].
    #[serde(default)]
    config: Map<String, Value>,
}

/// On-disk panel declaration.
#[derive(Deserialize)]
struct RawPanel {
    /// Identifier.
    #[serde(default)]
    id: Option<String>,
    /// Name.
    #[serde(default)]
    name: Option<String>,
    /// Directory.
    path: PathBuf,
    /// Mount path.
    #[serde(default)]
    mount: Option<String>,
    /// Panel type.
    #[serde(default)]
    class: Option<String>,
    /// Parameters.
    #[serde(default)]
    params: Map<String, Value>,
}

/// On-disk hook declaration; `event` is accepted as an alias of `topic`.
#[derive(Deserialize)]
struct RawHook {
    /// Topic.
    #[serde(default)]
    topic: Option<String>,
    /// Alias of `topic`.
    #[serde(default)]
    event: Option<String>,
    /// Handler name.
    handler: String,
    /// One-shot.
    #[serde(default)]
    once: bool,
}

impl PluginManifest {
    /// Parse manifest text; `path` is used for error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(text).map_err(|e| Error::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut panels = Vec::with_capacity(raw.panels.len());
        for p in raw.panels {
            let (id, name) = match (p.id, p.name) {
                (Some(id), Some(name)) => (id, name),
                (Some(id), None) => (id.clone(), id),
                (None, Some(name)) => (name.clone(), name),
                (None, None) => {
                    return Err(Error::Manifest {
                        path: path.to_path_buf(),
                        message: "panel declaration needs an id or a name".into(),
                    });
                }
            };
            panels.push(PanelDecl {
                id,
                name,
                path: p.path,
                mount: p.mount.unwrap_or_else(|| DEFAULT_MOUNT.to_string()),
                class: p.class,
                params: p.params,
            });
        }
        // hooks without a topic are dropped
        let events = raw
            .events
            .into_iter()
            .filter_map(|h| {
                let topic = h.topic.or(h.event).filter(|t| !t.is_empty())?;
                Some(HookDecl {
                    topic: Topic::from(topic.as_str()),
                    handler: h.handler,
                    once: h.once,
                })
            })
            .collect();
        Ok(Self {
            name: raw.name,
            version: raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            entry_point: raw.entry_point,
            description: raw.description,
            panels,
            events,
            config: raw.config,
        })
    }

    /// Read `dir/plugin.toml`; `None` when the file does not exist.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(&text, &path).map(Some)
    }

    /// Split the entry point into `(module, name)`.
    pub fn entry_point_parts(&self) -> Result<(&str, &str)> {
        match self.entry_point.split_once(':') {
            Some((m, n)) if !m.is_empty() && !n.is_empty() => Ok((m, n)),
            _ => Err(Error::InvalidEntryPoint(self.entry_point.clone())),
        }
    }
}

//! Declarative panel trees (`items.toml`).
//!
//! ```toml
//! [panel]
//! label = "Media"
//! icon = "media.png"
//! [panel.next_page]
//! icon = "more.png"
//!
//! [[items]]
//! name = "play"
//! type = "button"
//! class = "launch"
//! params = { command = "playerctl", args = ["play-pause"] }
//!
//! [[items]]
//! name = "lights"
//! type = "panel"
//! path = "lights"
//! ```
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::{
    Error, ItemSpec, NodeId, PanelLook, Registry, Result,
    catalog::{DEFAULT_BUTTON, DEFAULT_PANEL},
};

/// File name of a panel declaration.
pub const ITEMS_FILE: &str = "items.toml";

/// Kind of a declared entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A leaf control.
    Button,
    /// A nested panel directory.
    Panel,
}

/// One `[[items]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDecl {
    /// Item name, unique within the panel.
    pub name: String,
    /// Button or panel.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Path relative to the declaring panel's directory.
    #[serde(default)]
    pub path: Option<String>,
    /// Catalog type id; defaults to `button` / `panel`.
    #[serde(default)]
    pub class: Option<String>,
    /// Constructor parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Contents of an `items.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsFile {
    /// Appearance of the panel and its navigation keys.
    #[serde(default)]
    pub panel: PanelLook,
    /// Children in layout order.
    #[serde(default)]
    pub items: Vec<ItemDecl>,
}

impl ItemsFile {
    /// Parse a declaration from text.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read `dir/items.toml`; `None` when the file does not exist.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(ITEMS_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(&text, &path).map(Some)
    }
}

impl Registry {
    /// Populate `panel` from the declarations in `dir`, recursing into child
    /// panels, then repaginate it.
    ///
    /// Bad entries are logged and skipped; only an unreadable or malformed
    /// `items.toml` for `dir` itself is an error. Returns the number of
    /// direct children added.
    pub fn load_dir(&mut self, panel: NodeId, dir: &Path) -> Result<usize> {
        let Some(mut file) = ItemsFile::read(dir)? else {
            debug!(dir = %dir.display(), "no items.toml");
            self.repaginate(panel)?;
            return Ok(0);
        };
        file.panel.resolve(dir);
        self.set_look(panel, file.panel)?;

        let mut added = 0;
        for decl in &file.items {
            match self.load_entry(panel, dir, decl) {
                Ok(_) => added += 1,
                Err(e @ Error::DuplicateName { .. }) => warn!(item = %decl.name, error = %e, "skipped"),
                Err(e) => error!(item = %decl.name, error = %e, "skipped"),
            }
        }
        self.repaginate(panel)?;
        info!(panel = %self.path_of(panel), added, "loaded");
        Ok(added)
    }

    /// Build and attach one declared entry.
    fn load_entry(&mut self, panel: NodeId, dir: &Path, decl: &ItemDecl) -> Result<NodeId> {
        if self.child(panel, &decl.name).is_some() {
            return Err(Error::DuplicateName {
                panel: self.path_of(panel),
                name: decl.name.clone(),
            });
        }
        match decl.kind {
            EntryKind::Button => {
                // undeclared buttons resolve icons against the panel directory
                let path = match &decl.path {
                    Some(p) => {
                        let p = dir.join(p);
                        if !p.exists() {
                            return Err(Error::MissingPath(p));
                        }
                        p
                    }
                    None => dir.to_path_buf(),
                };
                let class = decl.class.as_deref().unwrap_or(DEFAULT_BUTTON);
                let behavior = self.catalog().button(
                    class,
                    &ItemSpec {
                        name: &decl.name,
                        path: Some(&path),
                        params: &decl.params,
                    },
                )?;
                self.add_button(panel, &decl.name, Some(path), behavior)
            }
            EntryKind::Panel => {
                let path: PathBuf = dir.join(decl.path.as_deref().unwrap_or(&decl.name));
                if !path.is_dir() {
                    return Err(Error::MissingPath(path));
                }
                let class = decl.class.as_deref().unwrap_or(DEFAULT_PANEL);
                let behavior = self.catalog().panel(
                    class,
                    &ItemSpec {
                        name: &decl.name,
                        path: Some(&path),
                        params: &decl.params,
                    },
                )?;
                let child = self.add_panel(panel, &decl.name, Some(path.clone()), behavior)?;
                if let Err(e) = self.load_dir(child, &path) {
                    error!(panel = %decl.name, error = %e, "failed to load panel contents");
                }
                Ok(child)
            }
        }
    }

    /// Load the root panel from `dir`.
    pub fn load_root(&mut self, dir: &Path) -> Result<usize> {
        let root = self.root();
        self.set_source_path(root, dir.to_path_buf())?;
        self.load_dir(root, dir)
    }
}

//! Named icon lookup.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

/// File extensions picked up as icons.
const ICON_EXTENSIONS: [&str; 2] = ["png", "svg"];

/// Icons indexed by file stem.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    /// Stem to file.
    icons: BTreeMap<String, PathBuf>,
}

impl AssetLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every icon in `dir`. A missing directory is logged and skipped.
    pub fn load_icons(&mut self, dir: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "icon directory unavailable");
                return 0;
            }
        };
        let mut n = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_icon = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| ICON_EXTENSIONS.contains(&e));
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if is_icon {
                debug!(icon = stem, "loaded icon");
                self.icons.insert(stem.to_string(), path.clone());
                n += 1;
            }
        }
        n
    }

    /// Library built from one directory.
    pub fn from_dir(dir: &Path) -> Self {
        let mut lib = Self::new();
        lib.load_icons(dir);
        lib
    }

    /// Resolve an icon reference: an existing file path, or a library name.
    pub fn icon(&self, name: &str) -> Option<PathBuf> {
        let p = Path::new(name);
        if p.is_file() {
            return Some(p.to_path_buf());
        }
        self.icons.get(name).cloned()
    }

    /// Number of indexed icons.
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    /// Whether no icons are indexed.
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

//! Read-only subcommands: `devices`, `plugins`, `show` and `config get`.
use std::{fmt::Write as _, path::Path};

use config::Settings;
use deck_device::{Device, DeviceManager};
use plugins::{Discovery, discover};
use serde_json::Value;

use crate::{Error, Result, start};

/// One line per enumerated deck.
pub fn devices(settings: &Settings) -> Result<String> {
    let manager = DeviceManager::from_config(&settings.simulator.devices)?;
    let mut out = format!(
        "{:>5}  {:<24} {:<20} {:>4}  {:<6} {}\n",
        "INDEX", "TYPE", "SERIAL", "KEYS", "LAYOUT", "IMAGE"
    );
    for (i, deck) in manager.enumerate().iter().enumerate() {
        let (rows, cols) = deck.key_layout();
        let img = deck.image_format();
        let _ignored = writeln!(
            out,
            "{i:>5}  {:<24} {:<20} {:>4}  {:<6} {}x{} {} flip={:?} rot={}",
            deck.deck_type(),
            deck.serial_number(),
            deck.key_count(),
            format!("{rows}x{cols}"),
            img.size.0,
            img.size.1,
            img.format,
            img.flip,
            img.rotation,
        );
    }
    Ok(out)
}

/// Manifests under `dir`, then the directories that have none.
pub fn plugins(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(Error::MissingPluginDir(dir.to_path_buf()));
    }
    Ok(format_discovery(dir, &discover(dir)?))
}

/// Render a discovery result.
fn format_discovery(dir: &Path, found: &Discovery) -> String {
    let mut out = String::new();
    if found.found.is_empty() {
        let _ignored = writeln!(out, "No plugins found in {}.", dir.display());
    }
    for (path, manifest) in &found.found {
        let _ignored = match manifest {
            Ok(m) => writeln!(
                out,
                "{} {} ({})\n    {}\n    {}",
                m.name,
                m.version,
                m.entry_point,
                path.display(),
                m.description.as_deref().unwrap_or("N/A"),
            ),
            Err(e) => writeln!(out, "! {}: {e}", path.display()),
        };
    }
    if !found.skipped.is_empty() {
        let names: Vec<String> = found
            .skipped
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        let _ignored = writeln!(out, "Skipped directories without a manifest: {}", names.join(", "));
    }
    out
}

/// The panel tree as `start` would build it, plugins included.
pub fn show(settings: &Settings, root: &Path) -> Result<String> {
    let device = start::select_device(settings)?;
    let (registry, _plugins) = start::build_tree(settings, root, &device)?;
    Ok(registry.structure())
}

/// A dotted configuration key, as JSON.
pub fn config_get(settings: &Settings, key: &str) -> Result<String> {
    match settings.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(v) => Ok(serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())),
        None => Err(Error::NoSuchKey(key.to_string())),
    }
}

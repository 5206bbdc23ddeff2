//! Locate and load `config.toml`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{Error, Settings};

/// Determine the preferred user config path (`~/.config/deckpilot/config.toml`).
pub fn default_config_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".config");
    p.push("deckpilot");
    p.push("config.toml");
    p
}

/// Resolve the effective config path using the default policy.
///
/// Policy:
/// 1) Use `explicit` when provided.
/// 2) Else use `~/.config/deckpilot/config.toml` when it exists.
/// 3) Else return a clear "no config found" error.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let preferred = default_config_path();
    if preferred.exists() {
        return Ok(preferred);
    }

    Err(Error::Read {
        path: Some(preferred),
        message: "No config found. Create ~/.config/deckpilot/config.toml or pass --config"
            .to_string(),
    })
}

/// Load and validate settings from a TOML file at `path`.
pub fn load_from_path(path: &Path) -> Result<Settings, Error> {
    let text = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    let settings = Settings::parse(&text).map_err(|e| e.with_path(path))?;
    info!(path = %path.display(), "configuration loaded");
    debug!(?settings, "configuration");
    Ok(settings)
}

/// Resolve, then load. Falls back to defaults when no path was given and no
/// default file exists.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Settings, Error> {
    match resolve_config_path(explicit) {
        Ok(p) => load_from_path(&p),
        Err(e) if explicit.is_none() => {
            info!(error = %e, "using default configuration");
            Ok(Settings::default())
        }
        Err(e) => Err(e),
    }
}

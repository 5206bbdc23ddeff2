//! DeckPilot application configuration.
//!
//! Settings live in a TOML file with `[general]`, `[streamdeck]`,
//! `[simulator]`, `[assets]`, `[plugins]` and `[commands]` sections. Any
//! other top-level table is kept verbatim and exposed to plugins.

mod error;
mod loader;
mod settings;

#[cfg(test)]
mod test_parse;

pub use error::{Error, excerpt_at};
pub use loader::{default_config_path, load_from_path, load_or_default, resolve_config_path};
pub use settings::{
    Assets, Commands, DEFAULT_CLOCK_TICK, DEFAULT_COMMAND_PORT, DEFAULT_HIDDEN_CLOCK_TICK, General,
    MAX_BRIGHTNESS, Plugins, Settings, SimDevice, Simulator, StreamDeck, lookup,
};

//! Typed view of `config.toml`.

use std::{
    collections::BTreeMap,
    path::PathBuf,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// Highest accepted brightness.
pub const MAX_BRIGHTNESS: u8 = 100;

/// Default visible tick period in seconds.
pub const DEFAULT_CLOCK_TICK: f64 = 2.0;

/// Default hidden tick period in seconds.
pub const DEFAULT_HIDDEN_CLOCK_TICK: f64 = 1.0;

/// Default command channel port.
pub const DEFAULT_COMMAND_PORT: u16 = 27876;

/// Whole application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Tick periods.
    #[serde(default)]
    pub general: General,
    /// Device selection and brightness.
    #[serde(default)]
    pub streamdeck: StreamDeck,
    /// Simulated devices available to the device manager.
    #[serde(default)]
    pub simulator: Simulator,
    /// Asset directories.
    #[serde(default)]
    pub assets: Assets,
    /// Plugin discovery.
    #[serde(default)]
    pub plugins: Plugins,
    /// External command channel.
    #[serde(default)]
    pub commands: Commands,
    /// Free-form sections, handed to plugins untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `[general]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct General {
    /// Visible tick period in seconds; `0` disables.
    pub clock_tick_interval: f64,
    /// Hidden tick period in seconds; `0` disables.
    pub hidden_clock_tick_interval: f64,
}

impl Default for General {
    fn default() -> Self {
        Self {
            clock_tick_interval: DEFAULT_CLOCK_TICK,
            hidden_clock_tick_interval: DEFAULT_HIDDEN_CLOCK_TICK,
        }
    }
}

impl General {
    /// Visible tick period, `None` when disabled.
    pub fn clock_tick(&self) -> Option<Duration> {
        period(self.clock_tick_interval)
    }

    /// Hidden tick period, `None` when disabled.
    pub fn hidden_clock_tick(&self) -> Option<Duration> {
        period(self.hidden_clock_tick_interval)
    }
}

/// Seconds to a tick period.
fn period(secs: f64) -> Option<Duration> {
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

/// `[streamdeck]`
///
/// An absent section selects the first device; a present one must name a
/// device itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDeck {
    /// Brightness percentage.
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    /// Position in the enumerated device list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_index: Option<usize>,
    /// Serial number; preferred over the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

/// Brightness used when none is configured.
fn default_brightness() -> u8 {
    30
}

impl Default for StreamDeck {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            device_index: Some(0),
            serial_number: None,
        }
    }
}

/// `[simulator]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulator {
    /// Simulated decks, in enumeration order.
    #[serde(default = "default_devices")]
    pub devices: Vec<SimDevice>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self {
            devices: default_devices(),
        }
    }
}

/// One deck of each supported model.
fn default_devices() -> Vec<SimDevice> {
    [
        ("original", "SIM-ORIGINAL-001"),
        ("mini", "SIM-MINI-001"),
        ("xl", "SIM-XL-001"),
        ("virtual_pad", "SIM-VPAD-001"),
    ]
    .into_iter()
    .map(|(kind, serial)| SimDevice {
        kind: kind.to_string(),
        serial: Some(serial.to_string()),
    })
    .collect()
}

/// One simulated deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimDevice {
    /// Model id: `original`, `mini`, `xl` or `virtual_pad`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Serial number; generated from the model and position when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

/// `[assets]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assets {
    /// Directory searched for named icons.
    pub icons_directory: PathBuf,
    /// Directory searched for fonts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fonts_directory: Option<PathBuf>,
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            icons_directory: PathBuf::from("assets/icons"),
            fonts_directory: None,
        }
    }
}

/// `[plugins]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plugins {
    /// Directory scanned for plugin subdirectories.
    pub directory: PathBuf,
}

impl Default for Plugins {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("plugins"),
        }
    }
}

/// `[commands]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Whether the listener is started.
    pub enabled: bool,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_COMMAND_PORT,
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let settings: Self = toml::from_str(text).map_err(|e| Error::from_toml(text, &e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations the engine cannot start with.
    pub fn validate(&self) -> Result<(), Error> {
        let sd = &self.streamdeck;
        if sd.device_index.is_none() && sd.serial_number.is_none() {
            return Err(invalid(
                "[streamdeck] needs at least one of device_index or serial_number",
            ));
        }
        if sd.brightness > MAX_BRIGHTNESS {
            return Err(invalid(format!(
                "[streamdeck] brightness {} is above {MAX_BRIGHTNESS}",
                sd.brightness
            )));
        }
        for (name, v) in [
            ("clock_tick_interval", self.general.clock_tick_interval),
            ("hidden_clock_tick_interval", self.general.hidden_clock_tick_interval),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(format!("[general] {name} must be >= 0, got {v}")));
            }
        }
        if self.simulator.devices.is_empty() {
            return Err(invalid("[simulator] devices must not be empty"));
        }
        Ok(())
    }

    /// The whole configuration as JSON.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Configuration handed to plugins: every section, known or not.
    pub fn plugin_config(&self) -> Value {
        self.to_value()
    }

    /// Look up a dotted key such as `streamdeck.brightness`.
    ///
    /// Numeric segments index into arrays.
    pub fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.to_value(), key).cloned()
    }
}

/// Walk a dotted key through nested objects and arrays.
pub fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut cur = root;
    for part in key.split('.').filter(|p| !p.is_empty()) {
        cur = match cur {
            Value::Object(m) => m.get(part)?,
            Value::Array(a) => a.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Validation error without a path.
fn invalid(message: impl Into<String>) -> Error {
    Error::Validation {
        path: None,
        message: message.into(),
    }
}

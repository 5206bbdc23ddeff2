//! Driver contract.
use std::{path::PathBuf, sync::Arc};

use deck_protocol::{Anchor, Color, Margins};

use crate::{ImageFormat, Model, Result};

/// Called with `(key, pressed)` on every real key transition.
pub type KeyCallback = Arc<dyn Fn(usize, bool) + Send + Sync>;

/// A composed key image, ready for the device's native format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyImage {
    /// Resolved icon file, if the icon was found.
    pub icon: Option<PathBuf>,
    /// Caption.
    pub text: String,
    /// Icon margins.
    pub margins: Margins,
    /// Caption anchor.
    pub anchor: Anchor,
    /// Caption colour.
    pub color: Color,
    /// Target format.
    pub format: ImageFormat,
}

/// A grid key controller.
///
/// Drivers are shared between the engine, the renderer and the key reader,
/// so every method takes `&self`.
pub trait Device: Send + Sync {
    /// Model and geometry.
    fn model(&self) -> Model;

    /// Serial number.
    fn serial_number(&self) -> &str;

    /// Firmware version string.
    fn firmware_version(&self) -> &str {
        "1.0.0"
    }

    /// Stable identifier.
    fn id(&self) -> String {
        format!("{}:{}", self.model(), self.serial_number())
    }

    /// Number of keys.
    fn key_count(&self) -> usize {
        self.model().key_count()
    }

    /// `(rows, cols)`.
    fn key_layout(&self) -> (usize, usize) {
        self.model().key_layout()
    }

    /// Native key image format.
    fn image_format(&self) -> ImageFormat {
        self.model().image_format()
    }

    /// Human readable model name.
    fn deck_type(&self) -> &'static str {
        self.model().deck_type()
    }

    /// Start delivering key events.
    fn open(&self);

    /// Stop delivering key events.
    fn close(&self);

    /// Whether the device is open.
    fn is_open(&self) -> bool;

    /// Blank every key image.
    fn reset(&self);

    /// Set brightness; values above 100 clamp to 100.
    fn set_brightness(&self, percent: u8);

    /// Current brightness.
    fn brightness(&self) -> u8;

    /// Install the key transition callback, replacing any previous one.
    fn set_key_callback(&self, callback: KeyCallback);

    /// Upload one key image.
    fn set_key_image(&self, key: usize, image: KeyImage) -> Result<()>;

    /// Inject a key transition as if the hardware reported it.
    ///
    /// The callback only fires on a real transition of an open device.
    fn simulate_key(&self, key: usize, pressed: bool) -> Result<()>;
}

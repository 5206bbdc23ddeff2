//! Supported deck models and their geometry.
use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::Error;

/// Native key image format of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageFormat {
    /// Width and height in pixels.
    pub size: (u32, u32),
    /// Encoding expected by the hardware.
    pub format: &'static str,
    /// Horizontal and vertical flip.
    pub flip: (bool, bool),
    /// Clockwise rotation in degrees.
    pub rotation: u16,
}

/// A deck model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    /// 15 keys, 3x5.
    Original,
    /// 6 keys, 2x3.
    Mini,
    /// 32 keys, 4x8.
    Xl,
    /// 45 keys, 3x15.
    VirtualPad,
}

impl Model {
    /// Every model, in documentation order.
    pub const ALL: [Self; 4] = [Self::Original, Self::Mini, Self::Xl, Self::VirtualPad];

    /// Configuration id.
    pub fn id(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Mini => "mini",
            Self::Xl => "xl",
            Self::VirtualPad => "virtual_pad",
        }
    }

    /// Human readable name.
    pub fn deck_type(self) -> &'static str {
        match self {
            Self::Original => "Stream Deck Original (Simulator)",
            Self::Mini => "Stream Deck Mini (Simulator)",
            Self::Xl => "Stream Deck XL (Simulator)",
            Self::VirtualPad => "Stream Deck Virtual Pad (Simulator)",
        }
    }

    /// `(rows, cols)`.
    pub fn key_layout(self) -> (usize, usize) {
        match self {
            Self::Original => (3, 5),
            Self::Mini => (2, 3),
            Self::Xl => (4, 8),
            Self::VirtualPad => (3, 15),
        }
    }

    /// Number of keys.
    pub fn key_count(self) -> usize {
        let (rows, cols) = self.key_layout();
        rows * cols
    }

    /// Native key image format. Every simulated model takes flipped BMPs.
    pub fn image_format(self) -> ImageFormat {
        let px = match self {
            Self::Original | Self::VirtualPad => 72,
            Self::Mini => 80,
            Self::Xl => 96,
        };
        ImageFormat {
            size: (px, px),
            format: "BMP",
            flip: (true, true),
            rotation: 0,
        }
    }

    /// Serial number assigned to the `position`-th (1-based) configured
    /// device when none is given.
    pub fn default_serial(self, position: usize) -> String {
        format!("SIM-{}-{position:03}", self.id().to_uppercase())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" | "streamdeck_original" => Ok(Self::Original),
            "mini" | "streamdeck_mini" => Ok(Self::Mini),
            "xl" | "streamdeck_xl" => Ok(Self::Xl),
            "virtual_pad" => Ok(Self::VirtualPad),
            other => Err(Error::Config(format!("Unsupported device type '{other}'"))),
        }
    }
}

//! Shared protocol types for DeckPilot.
//!
//! - [`DisplayDescriptor`]: what an item wants a key to look like.
//! - [`command`]: messages exchanged over the external command socket.
//! - [`codec`]: newline-delimited JSON framing for those messages.
//! - [`render`]: the contract between the panel engine and whatever draws keys.
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod codec;
pub mod command;
pub mod render;

pub use command::{ExternalMessage, MessageType, PushRequest};
pub use render::Renderer;

/// Default host for the external command listener.
pub const DEFAULT_COMMAND_HOST: &str = "127.0.0.1";
/// Default port for the external command listener.
pub const DEFAULT_COMMAND_PORT: u16 = 27876;

/// Well-known icon names resolved by the renderer's asset lookup.
pub mod icons {
    /// Default button icon.
    pub const DEFAULT: &str = "default";
    /// Default button icon while pressed.
    pub const DEFAULT_PRESSED: &str = "default_pressed";
    /// Icon for a panel shown as a key.
    pub const PANEL: &str = "default_panel";
    /// Icon for a panel shown as a key while pressed.
    pub const PANEL_PRESSED: &str = "default_panel_pressed";
    /// Parent navigation key.
    pub const PARENT: &str = "parent";
    /// Parent navigation key while pressed.
    pub const PARENT_PRESSED: &str = "parent_pressed";
    /// Next page navigation key.
    pub const NEXT_PAGE: &str = "next_page";
    /// Next page navigation key while pressed.
    pub const NEXT_PAGE_PRESSED: &str = "next_page_pressed";
    /// Previous page navigation key.
    pub const PREVIOUS_PAGE: &str = "previous_page";
    /// Previous page navigation key while pressed.
    pub const PREVIOUS_PAGE_PRESSED: &str = "previous_page_pressed";
    /// Blank key used when clearing the deck.
    pub const EMPTY: &str = "empty";
}

/// Margins around the icon, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    /// Top margin.
    pub top: u32,
    /// Right margin.
    pub right: u32,
    /// Bottom margin (leaves room for the caption by default).
    pub bottom: u32,
    /// Left margin.
    pub left: u32,
}

impl Margins {
    /// Construct margins in top/right/bottom/left order.
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::new(0, 0, 20, 0)
    }
}

/// Caption anchor relative to the key image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Horizontally centred, sitting on the bottom edge.
    #[default]
    MiddleBottom,
    /// Centred on both axes.
    Middle,
    /// Horizontally centred, hanging from the top edge.
    MiddleTop,
}

/// RGB text colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Plain white, the default caption colour.
    pub const WHITE: Self = Self(255, 255, 255);
    /// Red, used by items to flag an error state.
    pub const RED: Self = Self(255, 64, 64);
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Renderable output of an item handler.
///
/// Handlers return `Option<DisplayDescriptor>`; `None` means "leave the key
/// unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    /// Caption drawn over the icon.
    pub text: String,
    /// Icon reference (asset name or path), if any.
    #[serde(default)]
    pub icon: Option<String>,
    /// Icon margins.
    #[serde(default)]
    pub margins: Margins,
    /// Caption anchor.
    #[serde(default)]
    pub anchor: Anchor,
    /// Caption colour.
    #[serde(default)]
    pub color: Color,
}

impl DisplayDescriptor {
    /// A descriptor with the given caption and default layout.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the icon reference.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Set the caption anchor.
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the caption colour.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

impl fmt::Display for DisplayDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.icon {
            Some(icon) => write!(f, "[{}] {}", icon, self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

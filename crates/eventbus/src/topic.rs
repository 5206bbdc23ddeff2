use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Event topic.
///
/// Well-known topics cover the device, item, panel and process lifecycle.
/// Plugins may use any other name, which parses to [`Topic::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A key went down on the active panel.
    KeyPressed,
    /// A key came up on the active panel.
    KeyReleased,
    /// Raw device key transition.
    KeyChanged,
    /// An item was asked to render.
    ItemRendered,
    /// An item was pressed.
    ItemPressed,
    /// An item was released.
    ItemReleased,
    /// Visible periodic tick.
    ClockTick,
    /// Hidden periodic tick, delivered regardless of visibility.
    InternalClockTick,
    /// A panel became active.
    PanelActivated,
    /// A panel stopped being active.
    PanelDeactivated,
    /// A panel drew its current page.
    PanelRendered,
    /// A panel switched pages.
    PanelPageChanged,
    /// The next-page navigation key was released.
    PanelNextPage,
    /// The previous-page navigation key was released.
    PanelPreviousPage,
    /// The parent navigation key was released.
    PanelParent,
    /// The device has been opened and the tree rendered.
    Initialized,
    /// The process is shutting down.
    Exit,
    /// Any other topic name.
    Custom(String),
}

impl Topic {
    /// All well-known topics.
    pub const KNOWN: [Self; 17] = [
        Self::KeyPressed,
        Self::KeyReleased,
        Self::KeyChanged,
        Self::ItemRendered,
        Self::ItemPressed,
        Self::ItemReleased,
        Self::ClockTick,
        Self::InternalClockTick,
        Self::PanelActivated,
        Self::PanelDeactivated,
        Self::PanelRendered,
        Self::PanelPageChanged,
        Self::PanelNextPage,
        Self::PanelPreviousPage,
        Self::PanelParent,
        Self::Initialized,
        Self::Exit,
    ];

    /// Canonical name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::KeyPressed => "key_pressed",
            Self::KeyReleased => "key_released",
            Self::KeyChanged => "key_changed",
            Self::ItemRendered => "item_rendered",
            Self::ItemPressed => "item_pressed",
            Self::ItemReleased => "item_released",
            Self::ClockTick => "clock_tick",
            Self::InternalClockTick => "internal_clock_tick",
            Self::PanelActivated => "panel_activated",
            Self::PanelDeactivated => "panel_deactivated",
            Self::PanelRendered => "panel_rendered",
            Self::PanelPageChanged => "panel_page_changed",
            Self::PanelNextPage => "panel_next_page",
            Self::PanelPreviousPage => "panel_previous_page",
            Self::PanelParent => "panel_parent",
            Self::Initialized => "initialized",
            Self::Exit => "exit",
            Self::Custom(name) => name,
        }
    }

    /// Whether this is one of the well-known topics.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl FromStr for Topic {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the legacy aliases used in plugin manifests.
        let name = match s.trim() {
            "key_change" => "key_changed",
            "periodic" => "clock_tick",
            other => other,
        };
        Ok(Self::KNOWN
            .iter()
            .find(|t| t.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Custom(name.to_string())))
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

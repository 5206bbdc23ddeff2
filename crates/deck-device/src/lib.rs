//! Grid key controllers.
//!
//! [`Device`] is the driver contract. [`SimDeck`] implements it in memory for
//! every supported [`Model`]; [`DeviceManager`] enumerates and selects decks,
//! and [`DeviceRenderer`] draws [`deck_protocol::DisplayDescriptor`]s on one.
mod assets;
mod device;
mod error;
mod manager;
mod model;
mod renderer;
mod sim;

pub use assets::AssetLibrary;
pub use config::MAX_BRIGHTNESS;
pub use device::{Device, KeyCallback, KeyImage};
pub use error::{Error, Result};
pub use manager::DeviceManager;
pub use model::{ImageFormat, Model};
pub use renderer::DeviceRenderer;
pub use sim::SimDeck;

//! Renderer backed by a device.
use std::sync::Arc;

use deck_protocol::{DisplayDescriptor, Renderer, icons};
use tracing::{debug, warn};

use crate::{AssetLibrary, Device, KeyImage};

/// Composes descriptors into key images and uploads them.
pub struct DeviceRenderer {
    /// Target.
    device: Arc<dyn Device>,
    /// Icon lookup.
    assets: AssetLibrary,
}

impl DeviceRenderer {
    /// Draw on `device`, resolving icon names through `assets`.
    pub fn new(device: Arc<dyn Device>, assets: AssetLibrary) -> Self {
        Self { device, assets }
    }

    /// The target device.
    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Blank the device's key memory.
    pub fn reset_deck(&self) {
        self.device.reset();
    }

    /// Build the image for a descriptor.
    pub fn compose(&self, display: &DisplayDescriptor) -> KeyImage {
        let icon = display.icon.as_deref().and_then(|name| {
            let found = self.assets.icon(name);
            if found.is_none() {
                debug!(icon = name, "icon not found");
            }
            found
        });
        KeyImage {
            icon,
            text: display.text.clone(),
            margins: display.margins,
            anchor: display.anchor,
            color: display.color,
            format: self.device.image_format(),
        }
    }
}

impl Renderer for DeviceRenderer {
    fn render_key(&self, key: usize, display: &DisplayDescriptor) {
        if let Err(e) = self.device.set_key_image(key, self.compose(display)) {
            warn!(key, error = %e, "render failed");
        }
    }

    fn clear_deck(&self) {
        let blank = DisplayDescriptor::new("").with_icon(icons::EMPTY);
        for key in 0..self.device.key_count() {
            self.render_key(key, &blank);
        }
    }
}

//! Enumeration and selection of decks.
use std::sync::Arc;

use config::{SimDevice, StreamDeck};
use tracing::info;

use crate::{Device, Error, Model, Result, SimDeck};

/// Enumerates available decks and picks the one to drive.
pub struct DeviceManager {
    /// Decks in enumeration order.
    devices: Vec<Arc<SimDeck>>,
}

impl DeviceManager {
    /// One deck per configured entry. Unnamed decks get a serial derived from
    /// their model and 1-based position.
    pub fn from_config(entries: &[SimDevice]) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Config("at least one simulated device is required".into()));
        }
        let mut devices = Vec::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            let model: Model = e.kind.parse()?;
            let serial = e
                .serial
                .clone()
                .unwrap_or_else(|| model.default_serial(i + 1));
            devices.push(Arc::new(SimDeck::new(model, serial)));
        }
        Ok(Self { devices })
    }

    /// Wrap existing decks.
    pub fn with_devices(devices: Vec<Arc<SimDeck>>) -> Self {
        Self { devices }
    }

    /// Every deck.
    pub fn enumerate(&self) -> &[Arc<SimDeck>] {
        &self.devices
    }

    /// Pick a deck by serial number when one is given, else by index.
    pub fn select(&self, serial: Option<&str>, index: Option<usize>) -> Result<Arc<SimDeck>> {
        info!(found = self.devices.len(), "enumerated decks");
        let found = match (serial, index) {
            (Some(s), _) => self.devices.iter().find(|d| d.serial_number() == s),
            (None, Some(i)) => self.devices.get(i),
            (None, None) => None,
        };
        let deck = found.cloned().ok_or_else(|| {
            Error::NoDevice(match (serial, index) {
                (Some(s), _) => format!("serial {s}"),
                (None, Some(i)) => format!("index {i}"),
                (None, None) => "no serial number or index given".into(),
            })
        })?;
        info!(serial = %deck.serial_number(), deck_type = deck.deck_type(), "selected deck");
        Ok(deck)
    }

    /// Select using the `[streamdeck]` settings.
    pub fn select_configured(&self, settings: &StreamDeck) -> Result<Arc<SimDeck>> {
        self.select(settings.serial_number.as_deref(), settings.device_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, serial: Option<&str>) -> SimDevice {
        SimDevice {
            kind: kind.into(),
            serial: serial.map(Into::into),
        }
    }

    #[test]
    fn serials_are_generated() {
        let m = DeviceManager::from_config(&[entry("mini", None), entry("xl", Some("X"))]).unwrap();
        let serials: Vec<&str> = m.enumerate().iter().map(|d| d.serial_number()).collect();
        assert_eq!(serials, vec!["SIM-MINI-001", "X"]);
    }

    #[test]
    fn serial_wins_over_index() {
        let m = DeviceManager::from_config(&[entry("original", Some("A")), entry("xl", Some("B"))])
            .unwrap();
        assert_eq!(m.select(Some("B"), Some(0)).unwrap().model(), Model::Xl);
        assert_eq!(m.select(None, Some(0)).unwrap().serial_number(), "A");
        // a serial that matches nothing does not fall back to the index
        assert!(matches!(m.select(Some("C"), Some(0)), Err(Error::NoDevice(_))));
        assert!(m.select(None, Some(2)).is_err());
        assert!(m.select(None, None).is_err());
    }

    #[test]
    fn bad_config() {
        assert!(DeviceManager::from_config(&[]).is_err());
        assert!(DeviceManager::from_config(&[entry("plus", None)]).is_err());
    }
}

//! In-memory simulated decks.
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::{Device, Error, KeyCallback, KeyImage, MAX_BRIGHTNESS, Model, Result};

/// Mutable device state.
struct State {
    /// Open for key events.
    open: bool,
    /// Brightness percentage.
    brightness: u8,
    /// Held keys.
    keys: Vec<bool>,
    /// Last uploaded image per key.
    images: Vec<Option<KeyImage>>,
    /// Transition callback.
    callback: Option<KeyCallback>,
}

/// A simulated deck of any [`Model`].
pub struct SimDeck {
    /// Geometry.
    model: Model,
    /// Serial number.
    serial: String,
    /// Everything that changes.
    state: Mutex<State>,
}

impl SimDeck {
    /// A closed device with blank keys.
    pub fn new(model: Model, serial: impl Into<String>) -> Self {
        let count = model.key_count();
        Self {
            model,
            serial: serial.into(),
            state: Mutex::new(State {
                open: false,
                brightness: MAX_BRIGHTNESS,
                keys: vec![false; count],
                images: vec![None; count],
                callback: None,
            }),
        }
    }

    /// Check a key index.
    fn check(&self, key: usize) -> Result<()> {
        let count = self.model.key_count();
        if key < count {
            Ok(())
        } else {
            Err(Error::KeyOutOfRange { key, count })
        }
    }

    /// Simulate pressing a key.
    pub fn press_key(&self, key: usize) -> Result<()> {
        self.transition(key, true)
    }

    /// Simulate releasing a key.
    pub fn release_key(&self, key: usize) -> Result<()> {
        self.transition(key, false)
    }

    /// Record a key state and fire the callback outside the lock.
    fn transition(&self, key: usize, pressed: bool) -> Result<()> {
        self.check(key)?;
        let callback = {
            let mut st = self.state.lock();
            if st.keys[key] == pressed {
                return Ok(());
            }
            st.keys[key] = pressed;
            if st.open { st.callback.clone() } else { None }
        };
        trace!(serial = %self.serial, key, pressed, "key transition");
        if let Some(cb) = callback {
            cb(key, pressed);
        }
        Ok(())
    }

    /// Held state of every key.
    pub fn key_states(&self) -> Vec<bool> {
        self.state.lock().keys.clone()
    }

    /// Last image uploaded to `key`.
    pub fn key_image(&self, key: usize) -> Result<Option<KeyImage>> {
        self.check(key)?;
        Ok(self.state.lock().images[key].clone())
    }
}

impl Device for SimDeck {
    fn model(&self) -> Model {
        self.model
    }

    fn serial_number(&self) -> &str {
        &self.serial
    }

    fn open(&self) {
        self.state.lock().open = true;
        info!(serial = %self.serial, model = %self.model, "device opened");
    }

    fn close(&self) {
        self.state.lock().open = false;
        info!(serial = %self.serial, "device closed");
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn reset(&self) {
        let mut st = self.state.lock();
        st.images.iter_mut().for_each(|i| *i = None);
        debug!(serial = %self.serial, "device reset");
    }

    fn set_brightness(&self, percent: u8) {
        self.state.lock().brightness = percent.min(MAX_BRIGHTNESS);
    }

    fn brightness(&self) -> u8 {
        self.state.lock().brightness
    }

    fn set_key_callback(&self, callback: KeyCallback) {
        self.state.lock().callback = Some(callback);
    }

    fn set_key_image(&self, key: usize, image: KeyImage) -> Result<()> {
        self.check(key)?;
        self.state.lock().images[key] = Some(image);
        Ok(())
    }

    fn simulate_key(&self, key: usize, pressed: bool) -> Result<()> {
        self.transition(key, pressed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn recorder(dev: &SimDeck) -> Arc<Mutex<Vec<(usize, bool)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        dev.set_key_callback(Arc::new(move |k, p| s.lock().push((k, p))));
        seen
    }

    #[test]
    fn callback_only_on_transitions_while_open() {
        let dev = SimDeck::new(Model::Original, "SIM-1");
        let seen = recorder(&dev);

        dev.press_key(2).unwrap();
        assert!(seen.lock().is_empty(), "closed devices stay silent");
        dev.release_key(2).unwrap();

        dev.open();
        dev.press_key(2).unwrap();
        dev.press_key(2).unwrap();
        dev.release_key(2).unwrap();
        dev.release_key(2).unwrap();
        assert_eq!(*seen.lock(), vec![(2, true), (2, false)]);
    }

    #[test]
    fn out_of_range_keys() {
        let dev = SimDeck::new(Model::Mini, "SIM-2");
        dev.open();
        assert!(matches!(
            dev.press_key(6),
            Err(Error::KeyOutOfRange { key: 6, count: 6 })
        ));
        assert!(dev.key_image(6).is_err());
    }

    #[test]
    fn brightness_clamps() {
        let dev = SimDeck::new(Model::Xl, "SIM-3");
        dev.set_brightness(250);
        assert_eq!(dev.brightness(), 100);
        dev.set_brightness(0);
        assert_eq!(dev.brightness(), 0);
    }

    #[test]
    fn callback_may_reenter_device() {
        let dev = Arc::new(SimDeck::new(Model::Original, "SIM-4"));
        dev.open();
        let d = dev.clone();
        dev.set_key_callback(Arc::new(move |k, _| {
            let _ = d.key_image(k);
            d.reset();
        }));
        dev.press_key(0).unwrap();
        assert!(dev.key_states()[0]);
    }
}

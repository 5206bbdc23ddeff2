//! DeckPilot engine.
//!
//! [`Engine`] owns the panel [`Registry`] behind the dispatch lock and ties
//! it to a [`Device`]:
//! - device key transitions are routed into the active panel,
//! - visible and hidden ticks are driven by background tickers,
//! - [`Engine::push`] simulates a timed key press on the device.
//!
//! Bus notifications queued by the registry are delivered after the lock is
//! released, so handlers may call back into the engine.
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use deck_device::{Device, Error as DeviceError};
use eventbus::{EventBus, Payload, Topic};
use panels::Registry;
use parking_lot::Mutex;
use tokio::{task::JoinHandle, time};
use tracing::{debug, info, trace, warn};

mod error;
mod ticker;

pub use error::{Error, Result};
pub use ticker::{STOP_WAIT_TIMEOUT, Ticker};

/// Ticker name for the visible tick.
const VISIBLE_TICK: &str = "clock_tick";
/// Ticker name for the hidden tick.
const HIDDEN_TICK: &str = "internal_clock_tick";

/// Tick intervals; `None` disables a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickIntervals {
    /// Delivered to the active panel's current page.
    pub visible: Option<Duration>,
    /// Delivered to every item in the tree.
    pub hidden: Option<Duration>,
}

/// Shared engine state.
struct Inner {
    /// The tree; this lock serializes every dispatch and draw.
    registry: Mutex<Registry>,
    /// Shared bus, cloned out of the registry.
    bus: EventBus,
    /// Driven deck.
    device: Arc<dyn Device>,
    /// Tick tasks.
    ticker: Ticker,
    /// Tick configuration.
    intervals: TickIntervals,
}

impl Inner {
    /// Run `f` under the dispatch lock, then deliver what it queued.
    fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        let (out, pending) = {
            let mut reg = self.registry.lock();
            let out = f(&mut reg);
            (out, reg.take_notifications())
        };
        for n in pending {
            n.deliver(&self.bus);
        }
        out
    }

    /// Route one key transition.
    fn key_change(&self, key: usize, pressed: bool) {
        trace!(key, pressed, "key change");
        self.with_registry(|r| r.key_change(key, pressed));
    }

    /// Visible tick.
    fn tick(&self, index: u64, count: u64) {
        self.with_registry(|r| r.tick(index, count));
        self.bus.publish(&Topic::ClockTick, &Payload::Tick { index, count });
    }

    /// Hidden tick.
    fn hidden_tick(&self, index: u64, count: u64) {
        self.with_registry(|r| r.hidden_tick(index, count));
        self.bus
            .publish(&Topic::InternalClockTick, &Payload::Tick { index, count });
    }
}

/// Drives a panel tree from a device.
///
/// Cloning yields another handle onto the same engine.
#[derive(Clone)]
pub struct Engine {
    /// Shared state.
    inner: Arc<Inner>,
}

impl Engine {
    /// Wrap a built registry and the deck it draws on.
    pub fn new(registry: Registry, device: Arc<dyn Device>, intervals: TickIntervals) -> Self {
        let bus = registry.bus().clone();
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(registry),
                bus,
                device,
                ticker: Ticker::new(),
                intervals,
            }),
        }
    }

    /// Shared bus.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Driven deck.
    pub fn device(&self) -> &Arc<dyn Device> {
        &self.inner.device
    }

    /// Run `f` with exclusive access to the tree. Notifications it queues are
    /// delivered once the lock is released.
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        self.inner.with_registry(f)
    }

    /// Feed a device key transition into the active panel. Never fails;
    /// keys without an item are logged and ignored.
    pub fn on_key_change(&self, key: usize, pressed: bool) {
        self.inner.key_change(key, pressed);
    }

    /// Deliver one visible tick now.
    pub fn tick(&self, index: u64, count: u64) {
        self.inner.tick(index, count);
    }

    /// Deliver one hidden tick now.
    pub fn hidden_tick(&self, index: u64, count: u64) {
        self.inner.hidden_tick(index, count);
    }

    /// Open the deck, draw the active panel and start the tickers.
    ///
    /// Publishes [`Topic::Initialized`] once everything is wired. Must be
    /// called within a tokio runtime when any tick is enabled.
    pub fn start(&self, brightness: u8) {
        let device = &self.inner.device;
        if !device.is_open() {
            device.open();
        }
        device.reset();
        device.set_brightness(brightness);

        // the callback holds a weak handle: the device must not keep the engine alive
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        device.set_key_callback(Arc::new(move |key, pressed| {
            if let Some(inner) = weak.upgrade() {
                inner.key_change(key, pressed);
            }
        }));

        self.with_registry(Registry::render);
        self.start_tickers();
        info!(device = %device.id(), "engine started");
        self.inner.bus.publish(&Topic::Initialized, &Payload::Empty);
    }

    /// Start whichever tickers are enabled.
    fn start_tickers(&self) {
        let TickIntervals { visible, hidden } = self.inner.intervals;
        if let Some(every) = visible.filter(|d| !d.is_zero()) {
            let weak = Arc::downgrade(&self.inner);
            self.inner.ticker.start(VISIBLE_TICK, every, move |index, count| {
                if let Some(inner) = weak.upgrade() {
                    inner.tick(index, count);
                }
            });
        }
        if let Some(every) = hidden.filter(|d| !d.is_zero()) {
            let weak = Arc::downgrade(&self.inner);
            self.inner.ticker.start(HIDDEN_TICK, every, move |index, count| {
                if let Some(inner) = weak.upgrade() {
                    inner.hidden_tick(index, count);
                }
            });
        }
    }

    /// Whether the named tick is running.
    pub fn is_ticking(&self, hidden: bool) -> bool {
        self.inner
            .ticker
            .is_active(if hidden { HIDDEN_TICK } else { VISIBLE_TICK })
    }

    /// Press `key` now and release it after `duration`.
    ///
    /// The device must be open and `key` within its key count. The release
    /// runs on a background task that completes on its own.
    pub fn push(&self, key: usize, duration: Duration) -> Result<JoinHandle<()>> {
        let device = self.inner.device.clone();
        if !device.is_open() {
            return Err(Error::NotInitialized);
        }
        let count = device.key_count();
        if key >= count {
            return Err(DeviceError::KeyOutOfRange { key, count }.into());
        }
        if duration.is_zero() {
            return Err(Error::InvalidDuration);
        }
        debug!(key, duration_ms = duration.as_millis(), "simulated push");
        Ok(tokio::spawn(async move {
            if let Err(e) = device.simulate_key(key, true) {
                warn!(key, error = %e, "simulated press failed");
                return;
            }
            time::sleep(duration).await;
            if let Err(e) = device.simulate_key(key, false) {
                warn!(key, error = %e, "simulated release failed");
            }
        }))
    }

    /// Stop the tickers, publish [`Topic::Exit`] and release the deck.
    pub async fn shutdown(&self) {
        self.inner.ticker.clear().await;
        self.inner.bus.publish(&Topic::Exit, &Payload::Empty);
        let device = &self.inner.device;
        device.reset();
        device.close();
        info!(device = %device.id(), "engine stopped");
    }
}

//! Named periodic tasks with cancellation.
//!
//! Each ticker waits one interval, then calls its closure on every interval
//! with `(index, count)`: `index` numbers the calls from zero and `count` is
//! the number of whole intervals elapsed since the ticker started. The two
//! diverge when a slow handler causes ticks to be skipped.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Upper bound on how long [`Ticker::clear`] waits for each task.
pub const STOP_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// A running ticker.
struct TickerEntry {
    /// Cancels the loop.
    token: CancellationToken,
    /// The spawned loop.
    handle: JoinHandle<()>,
}

/// Set of named tickers; cloning shares the set.
#[derive(Clone, Default)]
pub struct Ticker {
    /// Running tickers by name.
    entries: Arc<Mutex<HashMap<String, TickerEntry>>>,
}

impl Ticker {
    /// No tickers running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a ticker named `id` is running.
    pub fn is_active(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Start, or replace, the ticker named `id`. Must be called within a
    /// tokio runtime.
    pub fn start<F>(&self, id: impl Into<String>, interval: Duration, mut on_tick: F)
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        let id = id.into();
        self.stop(&id);

        let token = CancellationToken::new();
        let cancel = token.clone();
        let name = id.clone();
        let handle = tokio::spawn(async move {
            trace!(ticker = %name, interval_ms = interval.as_millis(), "ticker start");
            let started = Instant::now();
            let mut timer = time::interval_at(time::Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut index = 0u64;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!(ticker = %name, "ticker cancelled");
                        return;
                    }
                    _ = timer.tick() => {
                        let count = (started.elapsed().as_nanos() / interval.as_nanos().max(1)) as u64;
                        on_tick(index, count);
                        index += 1;
                    }
                }
            }
        });
        self.entries.lock().insert(id, TickerEntry { token, handle });
    }

    /// Stop the ticker named `id`, if any. Does not wait.
    pub fn stop(&self, id: &str) {
        if let Some(entry) = self.entries.lock().remove(id) {
            entry.token.cancel();
            trace!(ticker = %id, "ticker stop");
        }
    }

    /// Cancel every ticker and wait briefly for each to finish.
    pub async fn clear(&self) {
        let entries: Vec<TickerEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for e in &entries {
            e.token.cancel();
        }
        for e in entries {
            let _ = time::timeout(STOP_WAIT_TIMEOUT, e.handle).await;
        }
        trace!("tickers cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_until_stopped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ticker = Ticker::new();
        let s = seen.clone();
        ticker.start("t", Duration::from_millis(10), move |index, count| {
            s.lock().push((index, count));
        });
        assert!(ticker.is_active("t"));
        time::sleep(Duration::from_millis(55)).await;
        ticker.stop("t");
        assert!(!ticker.is_active("t"));
        time::sleep(Duration::from_millis(20)).await;

        let snapshot = seen.lock().clone();
        assert!(snapshot.len() >= 2, "{snapshot:?}");
        assert_eq!(snapshot[0].0, 0);
        assert!(snapshot.iter().all(|(i, c)| c >= i && *c >= 1));
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(seen.lock().len(), snapshot.len());
    }

    #[tokio::test]
    async fn restart_replaces_and_clear_stops_all() {
        let ticker = Ticker::new();
        ticker.start("a", Duration::from_secs(60), |_, _| {});
        ticker.start("a", Duration::from_secs(60), |_, _| {});
        ticker.start("b", Duration::from_secs(60), |_, _| {});
        assert_eq!(ticker.entries.lock().len(), 2);
        ticker.clear().await;
        assert!(!ticker.is_active("a"));
        assert!(!ticker.is_active("b"));
    }
}

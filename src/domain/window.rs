// Window policy - Decides when the oldest samples leave the rolling window
use super::sample::Sample;
use super::series::PortSeriesStore;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;

/// How many stale samples a single append may evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionMode {
    /// At most one eviction per append. A shortened interval converges
    /// one sample at a time.
    #[default]
    Single,
    /// Evict until the window holds again.
    Sweep,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowPolicy {
    mode: EvictionMode,
}

impl WindowPolicy {
    pub fn new(mode: EvictionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> EvictionMode {
        self.mode
    }

    /// True when the oldest sample lies more than `interval` before the newest.
    ///
    /// Samples delivered out of order produce a negative span and never count
    /// as stale.
    pub fn is_stale(series: &VecDeque<Sample>, interval: Duration) -> bool {
        let (Some(oldest), Some(newest)) = (series.front(), series.back()) else {
            return false;
        };

        let span = newest.end_date - oldest.end_date;
        match chrono::Duration::from_std(interval) {
            Ok(window) => span > window,
            // Interval too large to represent; nothing can be outside it.
            Err(_) => false,
        }
    }

    /// True when the newest sample is older than the oldest one. Eviction
    /// cannot resume until a sample newer than the front arrives.
    pub fn is_stalled(series: &VecDeque<Sample>) -> bool {
        match (series.front(), series.back()) {
            (Some(oldest), Some(newest)) => newest.end_date < oldest.end_date,
            _ => false,
        }
    }

    /// Evict stale samples from the front of `port`'s series and return how
    /// many were removed. The newest sample is never evicted.
    pub fn apply(&self, store: &mut PortSeriesStore, port: &str, interval: Duration) -> usize {
        let mut evicted = 0;
        while Self::is_stale(store.get(port), interval) {
            store.evict_front(port);
            evicted += 1;
            if self.mode == EvictionMode::Single {
                break;
            }
        }
        evicted
    }
}

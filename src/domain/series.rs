// Port series store - Per-port sample history
use super::sample::Sample;
use std::collections::{HashMap, VecDeque};

static EMPTY_SERIES: VecDeque<Sample> = VecDeque::new();

/// Ordered samples for each port, oldest first.
///
/// Ports are remembered in first-seen order and are never dropped, even if
/// their series becomes empty.
#[derive(Debug, Default, Clone)]
pub struct PortSeriesStore {
    order: Vec<String>,
    series: HashMap<String, VecDeque<Sample>>,
}

impl PortSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `sample` to the tail of its port's series, creating the series on first use.
    pub fn append(&mut self, sample: Sample) {
        if let Some(series) = self.series.get_mut(&sample.port) {
            series.push_back(sample);
            return;
        }

        let port = sample.port.clone();
        self.order.push(port.clone());
        self.series.insert(port, VecDeque::from([sample]));
    }

    /// Current series for `port`, empty when the port is unknown.
    pub fn get(&self, port: &str) -> &VecDeque<Sample> {
        self.series.get(port).unwrap_or(&EMPTY_SERIES)
    }

    /// Known ports in first-seen order.
    pub fn ports(&self) -> &[String] {
        &self.order
    }

    /// Drop the oldest sample of `port`. No-op on an empty or unknown series.
    pub fn evict_front(&mut self, port: &str) -> Option<Sample> {
        self.series.get_mut(port).and_then(VecDeque::pop_front)
    }

    /// Series in first-seen port order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VecDeque<Sample>)> {
        self.order
            .iter()
            .map(|port| (port.as_str(), self.get(port)))
    }

    pub fn total_samples(&self) -> usize {
        self.series.values().map(VecDeque::len).sum()
    }
}

// Sample source trait - The transport that delivers bench readings
use crate::domain::sample::{RawSample, Sample, SampleError};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait SampleSource: Send {
    /// Wait for the next reading.
    ///
    /// `None` means the subscription has ended and no more samples will arrive.
    /// Must be cancel safe: the ingest loop races it against shutdown.
    async fn next_sample(&mut self) -> Option<Result<Sample, SampleError>>;
}

/// Source fed by an in-process channel of unvalidated payloads.
pub struct ChannelSource {
    rx: mpsc::Receiver<RawSample>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<RawSample>) -> Self {
        Self { rx }
    }

    /// Create a bounded channel and the source draining it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<RawSample>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl SampleSource for ChannelSource {
    async fn next_sample(&mut self) -> Option<Result<Sample, SampleError>> {
        let raw = self.rx.recv().await?;
        Some(Sample::try_from(raw))
    }
}

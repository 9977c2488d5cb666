// Ingest service - Drains the sample source into the port series store
use crate::application::sample_source::SampleSource;
use crate::domain::sample::Sample;
use crate::domain::series::PortSeriesStore;
use crate::domain::window::WindowPolicy;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, RwLock};
use tokio::task::JoinHandle;

/// Store shared between the ingest task (writer) and projections (readers).
pub type SharedStore = Arc<RwLock<PortSeriesStore>>;

pub struct IngestPipeline {
    store: SharedStore,
    policy: WindowPolicy,
    interval: watch::Receiver<Duration>,
    revision: watch::Sender<u64>,
}

impl IngestPipeline {
    pub fn new(
        store: SharedStore,
        policy: WindowPolicy,
        interval: watch::Receiver<Duration>,
        revision: watch::Sender<u64>,
    ) -> Self {
        Self {
            store,
            policy,
            interval,
            revision,
        }
    }

    /// Append one sample and apply the window policy to its port.
    ///
    /// Append and eviction happen under one write lock, so readers never see
    /// a partially evicted series. Returns the number of evicted samples.
    pub async fn on_sample(&self, sample: Sample) -> usize {
        let interval = *self.interval.borrow();
        let port = sample.port.clone();

        let (evicted, stalled) = {
            let mut store = self.store.write().await;
            store.append(sample);
            let evicted = self.policy.apply(&mut store, &port, interval);
            (evicted, WindowPolicy::is_stalled(store.get(&port)))
        };

        if evicted > 0 {
            tracing::debug!("Evicted {} sample(s) from {}", evicted, port);
        }
        if stalled {
            tracing::warn!(
                "Sample on {} is older than the front of its series, window is not evicting",
                port
            );
        }

        self.revision.send_modify(|r| *r = r.wrapping_add(1));
        evicted
    }

    /// Run the ingest loop on its own task until the source ends or the
    /// returned handle is shut down.
    pub fn spawn<S>(self, mut source: S) -> IngestHandle
    where
        S: SampleSource + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            tracing::info!("Ingest pipeline subscribed ({:?} eviction)", self.policy.mode());

            loop {
                let next = tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        tracing::info!("Ingest pipeline unsubscribed");
                        break;
                    }
                    next = source.next_sample() => next,
                };

                match next {
                    Some(Ok(sample)) => {
                        self.on_sample(sample).await;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Dropping malformed sample: {}", e);
                    }
                    None => {
                        tracing::info!("Sample source closed, ingest pipeline stopping");
                        break;
                    }
                }
            }
        });

        IngestHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Cancellation handle for a running ingest loop.
///
/// Dropping the handle also stops the loop.
pub struct IngestHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl IngestHandle {
    /// Unsubscribe from the source and wait for the loop to exit. No sample
    /// is applied to the store after this returns.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        // The loop may already have stopped on its own.
        let _ = self.shutdown.send(());
        self.task.await.context("ingest task failed")?;
        Ok(())
    }
}

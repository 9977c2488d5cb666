// Dashboard service - Use case for reading chart projections
use crate::application::ingest_service::SharedStore;
use crate::domain::dashboard::{self, Dashboard, SeriesTable};
use crate::domain::sample::{Measurement, Sample};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
pub struct DashboardService {
    store: SharedStore,
    interval: Arc<watch::Sender<Duration>>,
    revision: watch::Receiver<u64>,
}

impl DashboardService {
    pub fn new(
        store: SharedStore,
        interval: watch::Sender<Duration>,
        revision: watch::Receiver<u64>,
    ) -> Self {
        Self {
            store,
            interval: Arc::new(interval),
            revision,
        }
    }

    pub async fn open_ports(&self) -> Vec<String> {
        dashboard::open_ports(&*self.store.read().await)
    }

    pub async fn latest_per_port(&self) -> Vec<Sample> {
        dashboard::latest_per_port(&*self.store.read().await)
    }

    pub async fn series_table(&self, measurement: Measurement) -> SeriesTable {
        dashboard::series_table(&*self.store.read().await, measurement)
    }

    /// All projections taken from a single consistent view of the store.
    pub async fn snapshot(&self) -> Dashboard {
        let interval_secs = self.interval().as_secs();
        Dashboard::new(&*self.store.read().await, interval_secs)
    }

    pub fn interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// Change the rolling window. Takes effect on the next ingested sample.
    pub fn set_interval(&self, interval: Duration) {
        tracing::info!("Window interval set to {}s", interval.as_secs());
        self.interval.send_replace(interval);
    }

    /// Receiver that changes after every ingested sample.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingest_service::IngestPipeline;
    use crate::domain::sample::tests::sample_at;
    use crate::domain::window::WindowPolicy;

    fn service_and_pipeline(interval_secs: u64) -> (DashboardService, IngestPipeline) {
        let store = SharedStore::default();
        let (interval_tx, interval_rx) = watch::channel(Duration::from_secs(interval_secs));
        let (revision_tx, revision_rx) = watch::channel(0);
        let pipeline = IngestPipeline::new(
            store.clone(),
            WindowPolicy::default(),
            interval_rx,
            revision_tx,
        );
        (DashboardService::new(store, interval_tx, revision_rx), pipeline)
    }

    #[tokio::test]
    async fn test_open_ports_listed_once() {
        let (service, pipeline) = service_and_pipeline(60);
        for t in 0..3 {
            pipeline.on_sample(sample_at("X", t, 0)).await;
        }
        for t in 3..5 {
            pipeline.on_sample(sample_at("Y", t, 0)).await;
        }
        assert_eq!(service.open_ports().await, vec!["X".to_string(), "Y".to_string()]);
    }

    #[tokio::test]
    async fn test_interleaved_ports_table() {
        let (service, pipeline) = service_and_pipeline(60);
        pipeline.on_sample(sample_at("A", 0, 100)).await;
        pipeline.on_sample(sample_at("B", 0, 200)).await;
        pipeline.on_sample(sample_at("A", 1, 300)).await;
        pipeline.on_sample(sample_at("A", 2, 400)).await;

        let table = service.series_table(Measurement::Voltage).await;
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0].value("B").is_some());
        assert!(table.rows[1].value("B").is_none());
        assert!(table.rows[2].value("B").is_none());

        let latest = service.latest_per_port().await;
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].voltage, 400);
    }

    #[tokio::test]
    async fn test_set_interval_is_visible_in_snapshot() {
        let (service, pipeline) = service_and_pipeline(60);
        service.set_interval(Duration::from_secs(5));
        for t in [0, 3, 6] {
            pipeline.on_sample(sample_at("A", t, 0)).await;
        }

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.interval_secs, 5);
        assert_eq!(snapshot.latest_data.len(), 1);
        assert_eq!(snapshot.table(Measurement::Current).unwrap().rows.len(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_sees_ingest() {
        let (service, pipeline) = service_and_pipeline(60);
        let mut updates = service.subscribe();
        pipeline.on_sample(sample_at("A", 0, 0)).await;
        assert!(updates.has_changed().unwrap());
        updates.borrow_and_update();
        assert!(!updates.has_changed().unwrap());
    }
}

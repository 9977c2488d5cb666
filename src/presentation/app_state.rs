// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::domain::sample::RawSample;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    /// Producer side of the ingest channel.
    pub samples: mpsc::Sender<RawSample>,
}

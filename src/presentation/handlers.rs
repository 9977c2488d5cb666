// HTTP request handlers
use crate::domain::dashboard::{Dashboard, SeriesTable};
use crate::domain::sample::{BenchState, CompletionStatus, Measurement, RawSample, Sample};
use crate::infrastructure::bench_frame::{frames_to_samples, Frame};
use crate::presentation::app_state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

type HandlerError = (StatusCode, String);

#[derive(Debug, Serialize, Deserialize)]
pub struct IntervalBody {
    pub seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct FrameQuery {
    pub state: Option<BenchState>,
    pub status: Option<CompletionStatus>,
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub accepted: usize,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_ports(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.dashboard_service.open_ports().await)
}

pub async fn latest_data(State(state): State<Arc<AppState>>) -> Json<Vec<Sample>> {
    Json(state.dashboard_service.latest_per_port().await)
}

pub async fn series_table(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SeriesTable>, HandlerError> {
    let measurement = name
        .parse::<Measurement>()
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;

    Ok(Json(state.dashboard_service.series_table(measurement).await))
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<Dashboard> {
    Json(state.dashboard_service.snapshot().await)
}

/// Push a fresh snapshot every time a sample is ingested.
pub async fn stream_dashboard(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let service = state.dashboard_service.clone();
    let mut updates = service.subscribe();

    let stream = async_stream::stream! {
        updates.borrow_and_update();
        loop {
            let snapshot = service.snapshot().await;
            yield Event::default().event("dashboard").json_data(&snapshot);

            // Ends once the ingest pipeline has shut down.
            if updates.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn get_interval(State(state): State<Arc<AppState>>) -> Json<IntervalBody> {
    Json(IntervalBody {
        seconds: state.dashboard_service.interval().as_secs(),
    })
}

pub async fn set_interval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IntervalBody>,
) -> Json<IntervalBody> {
    state
        .dashboard_service
        .set_interval(Duration::from_secs(body.seconds));
    Json(body)
}

/// Accept one JSON bench reading.
pub async fn ingest_sample(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawSample>, JsonRejection>,
) -> Result<(StatusCode, Json<Accepted>), HandlerError> {
    let Json(raw) = payload.map_err(|rejection| {
        let reason = rejection.body_text();
        tracing::warn!("Rejecting malformed sample: {}", reason);
        (StatusCode::BAD_REQUEST, reason)
    })?;

    enqueue(&state, vec![raw]).await
}

/// Accept raw bench response frames read from `port`.
///
/// `RequestData` frames become samples; `Ping` and `RequestCompletion`
/// frames update the state stamped on the readings after them.
pub async fn ingest_frames(
    Path(port): Path<String>,
    Query(query): Query<FrameQuery>,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Accepted>), HandlerError> {
    let samples = Frame::decode_responses(&body)
        .and_then(|frames| {
            tracing::debug!("Decoded {} frame(s) from {}", frames.len(), port);
            frames_to_samples(
                &frames,
                &port,
                query.state.unwrap_or_default(),
                query.status.unwrap_or_default(),
                Utc::now(),
            )
        })
        .map_err(|e| {
            tracing::warn!("Rejecting frames from {}: {}", port, e);
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    enqueue(&state, samples).await
}

async fn enqueue(
    state: &AppState,
    samples: Vec<RawSample>,
) -> Result<(StatusCode, Json<Accepted>), HandlerError> {
    // Validate the whole batch before queuing any of it.
    for raw in &samples {
        if let Err(e) = Sample::try_from(raw.clone()) {
            tracing::warn!("Rejecting malformed sample: {}", e);
            return Err((StatusCode::BAD_REQUEST, e.to_string()));
        }
    }

    let accepted = samples.len();
    for raw in samples {
        if state.samples.send(raw).await.is_err() {
            tracing::error!("Ingest pipeline is not running, dropping sample");
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "ingest pipeline is not running".to_string(),
            ));
        }
    }

    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted })))
}

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::error::AppError;
use crate::tracker::{StartTracking, Tracker};
use crate::types::{TrackedMap, TrackedMatch};

#[derive(Clone)]
pub struct ApiState {
    pub tracker: Arc<Tracker>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl ApiState {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { health: tracker.health(), latency: tracker.latency(), tracker }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/tracked", get(get_tracked).post(post_tracked))
        .route("/tracked/:id", delete(delete_tracked))
        .route("/notifications/dismiss", post(post_dismiss))
        .route("/ws", get(ws_upgrade))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub polling: bool,
    pub polling_starts: u64,
    pub cycles_run: u64,
    pub fetch_failures: u64,
    pub last_cycle_at_ms: Option<u64>,
    pub tracked_count: u64,
    pub events_emitted: u64,
    pub queue_depth: usize,
    pub observers: usize,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_tracked(State(state): State<ApiState>) -> Result<Json<TrackedMap>, AppError> {
    Ok(Json(state.tracker.tracked().await?))
}

async fn post_tracked(
    State(state): State<ApiState>,
    Json(req): Json<StartTracking>,
) -> Result<(StatusCode, Json<TrackedMatch>), AppError> {
    let m = state.tracker.start_tracking(req).await?;
    Ok((StatusCode::CREATED, Json(m)))
}

async fn delete_tracked(
    State(state): State<ApiState>,
    Path(fixture_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tracker.stop_tracking(&fixture_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn post_dismiss(State(state): State<ApiState>) -> StatusCode {
    state.tracker.dismiss().await;
    StatusCode::ACCEPTED
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    let last = h.last_cycle_at_ms();
    Json(HealthResponse {
        polling: h.polling(),
        polling_starts: h.polling_starts(),
        cycles_run: h.cycles_run(),
        fetch_failures: h.fetch_failures(),
        last_cycle_at_ms: (last > 0).then_some(last),
        tracked_count: h.tracked_count(),
        events_emitted: h.events_emitted(),
        queue_depth: state.tracker.queue_depth(),
        observers: state.tracker.broadcaster().observer_count(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let percentiles = state.latency.percentiles_ms();
    Json(LatencyResponse {
        p50_ms: percentiles.map(|p| p.0),
        p95_ms: percentiles.map(|p| p.1),
        p99_ms: percentiles.map(|p| p.2),
        sample_count: state.latency.len(),
    })
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

async fn ws_upgrade(State(state): State<ApiState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| observe(socket, state.tracker))
}

/// Send the current map, then every broadcast until the observer goes away.
async fn observe(socket: WebSocket, tracker: Arc<Tracker>) {
    let mut updates = tracker.broadcaster().subscribe();
    let (mut sink, mut stream) = socket.split();

    match tracker.tracked().await {
        Ok(tracked) => {
            if send_map(&mut sink, &tracked).await.is_err() {
                return;
            }
        }
        Err(e) => warn!("Observer initial snapshot failed: {e}"),
    }
    info!("Observer connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(tracked) => {
                    if send_map(&mut sink, &tracked).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Observer lagging, skipping to latest");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!("Observer disconnected");
}

async fn send_map<S>(sink: &mut S, tracked: &TrackedMap) -> Result<(), ()>
where
    S: futures_util::Sink<Message> + Unpin,
{
    let body = match serde_json::to_string(tracked) {
        Ok(body) => body,
        Err(e) => {
            warn!("Tracked map not serializable: {e}");
            return Ok(());
        }
    };
    sink.send(Message::Text(body)).await.map_err(|_| ())
}

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::detector::{extract, LandmarkFrame, Metrics, TrackerSnapshot};
use crate::response::ok;
use crate::services::reporter::GestureReport;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/frame", post(ingest_frame))
        .route("/state", get(current_state))
        .route("/reset", post(reset_counters))
}

/// One captured tick from the browser loop. `landmarks` is `null` when the
/// landmark model reported no face for this frame.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    #[serde(default)]
    pub landmarks: Option<LandmarkFrame>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameResponse {
    pub state: TrackerSnapshot,
    /// Extracted scalars for the debug HUD; `null` when there was no usable
    /// face this tick.
    pub metrics: Option<Metrics>,
}

/// 每个动画帧调用一次：提取指标、推进跟踪器、按需广播和上报。
/// 锁内只做算术和变化检测，广播/入队都放在锁外。
async fn ingest_frame(
    State(state): State<AppState>,
    Json(req): Json<FrameRequest>,
) -> impl IntoResponse {
    let metrics = extract(req.landmarks.as_ref());

    let (snapshot, changed, report) = {
        let mut cell = state.tracker().lock().await;
        let before = cell.tracker.snapshot();
        let snapshot = cell.tracker.update(metrics.as_ref());

        let report = if snapshot.totals() != cell.last_reported {
            cell.last_reported = snapshot.totals();
            Some(GestureReport::new(
                snapshot.blinks,
                snapshot.mouth_opens,
                snapshot.brow_raises,
            ))
        } else {
            None
        };

        (snapshot, snapshot != before, report)
    };

    if changed {
        // 没有订阅者时发送失败是正常情况
        let _ = state.events_tx().send(snapshot);
    }
    if let Some(report) = report {
        state.reporter().enqueue(report);
    }

    ok(FrameResponse {
        state: snapshot,
        metrics,
    })
}

async fn current_state(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.tracker().lock().await.tracker.snapshot();
    ok(snapshot)
}

/// Zero the counters (UI reset button). Confirmed states and in-progress
/// pending runs survive; the zeroed totals are recorded outbound.
async fn reset_counters(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = {
        let mut cell = state.tracker().lock().await;
        cell.tracker.reset_counters();
        cell.last_reported = (0, 0, 0);
        cell.tracker.snapshot()
    };

    let _ = state.events_tx().send(snapshot);
    state.reporter().enqueue(GestureReport::zeroed());

    ok(snapshot)
}

use std::path::Path;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::detector::{ExpressionTracker, ThresholdConfig, ThresholdOverrides};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(get_thresholds)
            .put(put_thresholds)
            .delete(delete_thresholds),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdsResponse {
    /// The configuration the running tracker was built with.
    pub effective: ThresholdConfig,
    /// Persisted overrides, `null` when running on the base file alone.
    pub overrides: Option<ThresholdOverrides>,
}

async fn get_thresholds(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let overrides = state.store().get_threshold_overrides()?;
    let effective = *state.tracker().lock().await.tracker.config();
    Ok(ok(ThresholdsResponse {
        effective,
        overrides,
    }))
}

/// Persist a section-wise override and rebuild the tracker with the merged
/// configuration. 跟踪器按新阈值重建，状态和计数从零开始；
/// 历史计数已由快照持久化保存。
async fn put_thresholds(
    State(state): State<AppState>,
    Json(overrides): Json<ThresholdOverrides>,
) -> Result<impl IntoResponse, AppError> {
    let base = ThresholdConfig::load_or_default(Path::new(&state.config().thresholds_path));
    let merged = base.merged(&overrides);
    merged
        .validate()
        .map_err(|msg| AppError::bad_request("INVALID_THRESHOLDS", &msg))?;

    state.store().save_threshold_overrides(&overrides)?;
    swap_tracker(&state, merged).await?;

    tracing::info!("Threshold overrides updated, tracker rebuilt");
    Ok(ok(ThresholdsResponse {
        effective: merged,
        overrides: Some(overrides),
    }))
}

/// Drop persisted overrides and rebuild from the base file.
async fn delete_thresholds(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let base = ThresholdConfig::load_or_default(Path::new(&state.config().thresholds_path));
    base.validate()
        .map_err(|msg| AppError::bad_request("INVALID_THRESHOLDS", &msg))?;

    state.store().clear_threshold_overrides()?;
    swap_tracker(&state, base).await?;

    tracing::info!("Threshold overrides cleared, tracker rebuilt from base config");
    Ok(ok(ThresholdsResponse {
        effective: base,
        overrides: None,
    }))
}

async fn swap_tracker(state: &AppState, config: ThresholdConfig) -> Result<(), AppError> {
    // validate() 已通过，这里失败属于内部错误
    let tracker = ExpressionTracker::new(config)
        .map_err(|msg| AppError::internal(&format!("tracker rebuild failed: {msg}")))?;

    let snapshot = {
        let mut cell = state.tracker().lock().await;
        cell.tracker = tracker;
        cell.last_reported = (0, 0, 0);
        cell.tracker.snapshot()
    };
    let _ = state.events_tx().send(snapshot);
    Ok(())
}

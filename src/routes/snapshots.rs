use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_snapshots))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Recent persisted counter snapshots, newest first.
async fn list_snapshots(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(50)
        .min(state.config().limits.max_snapshot_page)
        .max(1);

    let snapshots = state.store().list_counter_snapshots(limit)?;
    Ok(ok(snapshots))
}

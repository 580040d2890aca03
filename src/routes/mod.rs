pub mod health;
pub mod realtime;
pub mod snapshots;
pub mod thresholds;
pub mod tracker;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::request_id;
use crate::state::AppState;

/// Maximum request body size: 2 MiB. A full refined-mesh frame is ~40 KiB
/// of JSON, so this leaves generous headroom.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/tracker", tracker::router())
        .nest("/thresholds", thresholds::router())
        .nest("/snapshots", snapshots::router())
        .nest("/realtime", realtime::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    // 捕获页（摄像头 + FaceMesh + 画布）作为静态文件提供，SPA 回退
    let spa_fallback =
        ServeDir::new("static").not_found_service(ServeFile::new("static/index.html"));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback_service(spa_fallback)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

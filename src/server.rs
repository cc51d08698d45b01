//! Router assembly and startup filesystem preparation.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::ws::handler::ws_handler;

/// Builds the full application: REST routes, the quiz socket, and the
/// HTTP middleware stack.
pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws/quiz/{quiz_id}", get(ws_handler))
        .route("/ws/quiz/{quiz_id}/", get(ws_handler))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Creates `MEDIA_ROOT/documents` and `VECTOR_DB_DIR` if missing.
///
/// # Errors
///
/// Returns the underlying I/O error if a directory cannot be created.
pub fn prepare_directories(config: &AppConfig) -> io::Result<Vec<PathBuf>> {
    let dirs = vec![config.media_root.join("documents"), config.vector_db_dir.clone()];
    for dir in &dirs {
        std::fs::create_dir_all(dir)?;
        tracing::debug!(path = %dir.display(), "directory ready");
    }
    Ok(dirs)
}

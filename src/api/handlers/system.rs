//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Current server time (RFC 3339).
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Active database backend.
    pub database: String,
    /// Active channel layer backend.
    pub channel_layer: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Pings the database, checks the channel layer subscription, and reports the active backends.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable or channel layer unsubscribed", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.quiz_service.store().database();
    let database_ok = match database.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "health check database ping failed");
            false
        }
    };
    let channels_ok = state.channels.is_healthy();
    if !channels_ok {
        tracing::warn!("health check: channel layer is not subscribed");
    }
    let (code, status) = if database_ok && channels_ok {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.backend_name().to_string(),
            channel_layer: state.channels.backend_name().to_string(),
        }),
    )
}

/// System routes mounted at the root level (not under `/api/quiz`).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

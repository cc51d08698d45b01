//! REST endpoint handlers organized by audience.

pub mod host;
pub mod public;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes the host and public routes under `/api/quiz`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(host::routes())
        .merge(public::routes())
}

//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::QuizId;

/// Query parameters accepted on the socket URL.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Host token.
    pub token: Option<String>,
    /// Alternative form: `Bearer <token>`.
    pub authorization: Option<String>,
}

impl WsParams {
    /// The host token, preferring `token` over `authorization`.
    #[must_use]
    pub fn host_token(&self) -> Option<String> {
        self.token
            .as_deref()
            .or_else(|| {
                self.authorization
                    .as_deref()
                    .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
            })
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// `GET /ws/quiz/{quiz_id}/`: Upgrade to the quiz session socket.
///
/// An unparseable ID is treated like an unknown quiz: the socket is
/// upgraded, told "Quiz not found", and closed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(raw_id): Path<String>,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let quiz_id = raw_id.parse::<QuizId>().ok();
    let host_token = params.host_token();
    let service = Arc::clone(&state.quiz_service);

    ws.on_upgrade(move |socket| run_connection(socket, quiz_id, host_token, service))
}

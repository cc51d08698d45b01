//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::channels::ChannelLayer;
use crate::service::QuizService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Quiz service for all business logic.
    pub quiz_service: Arc<QuizService>,
    /// Channel layer shared with the service, for socket registration.
    pub channels: ChannelLayer,
}

impl AppState {
    /// Builds the state around `service`, sharing its channel layer.
    #[must_use]
    pub fn new(service: QuizService) -> Self {
        let channels = service.channels().clone();
        Self {
            quiz_service: Arc::new(service),
            channels,
        }
    }
}

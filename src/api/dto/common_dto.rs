//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::LeaderboardEntry;

/// Response body for the leaderboard endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Ranked entries, best first.
    pub leaderboard: Vec<LeaderboardEntry>,
}


//! Participants, their answers, and the leaderboard ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::QuizId;
use super::question::AnswerOption;
use crate::error::QuizError;

/// Maximum nickname length in characters.
pub const MAX_NICKNAME_LEN: usize = 100;

/// A player who joined a quiz under a nickname.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Participant identifier.
    pub id: uuid::Uuid,
    /// Quiz joined.
    pub quiz_id: QuizId,
    /// Unique (per quiz) display name.
    pub nickname: String,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
    /// Sum of answer scores.
    pub total_score: i32,
    /// Number of correct answers.
    pub correct_answers: i32,
    /// Sum of answer response times, in seconds.
    pub total_response_time: f64,
}

/// One participant's answer to one question.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Answer identifier.
    pub id: uuid::Uuid,
    /// Who answered.
    pub participant_id: uuid::Uuid,
    /// Which question.
    pub question_id: uuid::Uuid,
    /// Chosen letter, `None` when time ran out.
    pub selected_option: Option<AnswerOption>,
    /// Whether the choice matched the correct answer.
    pub is_correct: bool,
    /// Seconds taken, as reported by the client.
    pub response_time: f64,
    /// Points awarded.
    pub score: i32,
    /// Submission timestamp.
    pub answered_at: DateTime<Utc>,
}

/// A row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Participant nickname.
    pub nickname: String,
    /// Total score.
    pub total_score: i32,
    /// Correct answer count.
    pub correct_answers: i32,
    /// Total response time in seconds.
    pub total_response_time: f64,
    /// 1-based rank.
    pub rank: u32,
}

/// Validates and normalizes a nickname.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] when blank or too long.
pub fn validate_nickname(raw: &str) -> Result<String, QuizError> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(QuizError::InvalidRequest("nickname required".to_string()));
    }
    if nickname.chars().count() > MAX_NICKNAME_LEN {
        return Err(QuizError::InvalidRequest(format!(
            "nickname must be at most {MAX_NICKNAME_LEN} characters"
        )));
    }
    Ok(nickname.to_string())
}

/// Orders participants by score (desc), then response time (asc), then
/// join time, and assigns ranks.
#[must_use]
pub fn rank_participants(mut participants: Vec<Participant>) -> Vec<LeaderboardEntry> {
    participants.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| {
                a.total_response_time
                    .partial_cmp(&b.total_response_time)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });

    participants
        .into_iter()
        .zip(1u32..)
        .map(|(p, rank)| LeaderboardEntry {
            nickname: p.nickname,
            total_score: p.total_score,
            correct_answers: p.correct_answers,
            total_response_time: p.total_response_time,
            rank,
        })
        .collect()
}

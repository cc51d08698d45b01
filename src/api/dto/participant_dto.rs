//! Participant DTOs: join and answer submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{AnswerOption, Participant};
use crate::service::{JoinOutcome, SubmitOutcome, Submission};

/// Request body for `POST /api/quiz/public/{id}/join`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Nickname, unique per quiz.
    pub nickname: String,
}

/// Participant as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantDto {
    /// Participant identifier.
    pub id: Uuid,
    /// Nickname.
    pub nickname: String,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
    /// Total score.
    pub total_score: i32,
    /// Correct answer count.
    pub correct_answers: i32,
    /// Total response time in seconds.
    pub total_response_time: f64,
}

impl From<&Participant> for ParticipantDto {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            nickname: p.nickname.clone(),
            joined_at: p.joined_at,
            total_score: p.total_score,
            correct_answers: p.correct_answers,
            total_response_time: p.total_response_time,
        }
    }
}

/// Response body for a join.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// The participant.
    pub participant: ParticipantDto,
    /// Whether the participant was created by this request.
    pub created: bool,
    /// Participant count after joining.
    pub participant_count: i64,
}

impl From<&JoinOutcome> for JoinResponse {
    fn from(outcome: &JoinOutcome) -> Self {
        Self {
            participant: ParticipantDto::from(&outcome.participant),
            created: outcome.created,
            participant_count: outcome.participant_count,
        }
    }
}

/// Request body for `POST /api/quiz/public/{id}/submit_answer`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Nickname used when joining.
    pub nickname: String,
    /// Question answered.
    pub question_id: Uuid,
    /// `A`–`D`; absent or blank for no answer.
    #[serde(default)]
    pub selected_option: Option<String>,
    /// Seconds taken.
    #[serde(default)]
    pub response_time: f64,
}

impl From<SubmitAnswerRequest> for Submission {
    fn from(req: SubmitAnswerRequest) -> Self {
        Self {
            nickname: req.nickname,
            question_id: req.question_id,
            selected_option: req.selected_option,
            response_time: req.response_time,
        }
    }
}

/// Response body for a scored answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    /// Question answered.
    pub question_id: Uuid,
    /// Letter chosen, if any.
    pub selected_option: Option<AnswerOption>,
    /// Whether it was correct.
    pub is_correct: bool,
    /// Points for this answer.
    pub score: i32,
    /// Participant after the answer was counted.
    pub participant: ParticipantDto,
}

impl From<&SubmitOutcome> for SubmitAnswerResponse {
    fn from(outcome: &SubmitOutcome) -> Self {
        Self {
            question_id: outcome.answer.question_id,
            selected_option: outcome.answer.selected_option,
            is_correct: outcome.answer.is_correct,
            score: outcome.answer.score,
            participant: ParticipantDto::from(&outcome.participant),
        }
    }
}

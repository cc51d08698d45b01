//! Question DTOs for host management and the public view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{AnswerOption, Question, QuestionDraft, QuestionPatch};

/// Request body for `POST /api/quiz/host/{id}/questions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuestionRequest {
    /// Prompt text.
    pub question_text: String,
    /// Option A text.
    pub option_a: String,
    /// Option B text.
    pub option_b: String,
    /// Option C text.
    pub option_c: String,
    /// Option D text.
    pub option_d: String,
    /// Correct letter.
    pub correct_answer: AnswerOption,
    /// Optional explanation.
    #[serde(default)]
    pub explanation: String,
    /// Sort key; defaults to 0.
    #[serde(default)]
    pub order: i32,
}

impl From<CreateQuestionRequest> for QuestionDraft {
    fn from(req: CreateQuestionRequest) -> Self {
        Self {
            question_text: req.question_text,
            options: [req.option_a, req.option_b, req.option_c, req.option_d],
            correct_answer: req.correct_answer,
            explanation: req.explanation,
            order: req.order,
        }
    }
}

/// Request body for `PUT /api/quiz/host/{id}/questions/{question_id}`.
///
/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateQuestionRequest {
    /// Prompt text.
    #[serde(default)]
    pub question_text: Option<String>,
    /// Option A text.
    #[serde(default)]
    pub option_a: Option<String>,
    /// Option B text.
    #[serde(default)]
    pub option_b: Option<String>,
    /// Option C text.
    #[serde(default)]
    pub option_c: Option<String>,
    /// Option D text.
    #[serde(default)]
    pub option_d: Option<String>,
    /// Correct letter.
    #[serde(default)]
    pub correct_answer: Option<AnswerOption>,
    /// Explanation.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Sort key.
    #[serde(default)]
    pub order: Option<i32>,
}

impl From<UpdateQuestionRequest> for QuestionPatch {
    fn from(req: UpdateQuestionRequest) -> Self {
        Self {
            question_text: req.question_text,
            options: [req.option_a, req.option_b, req.option_c, req.option_d],
            correct_answer: req.correct_answer,
            explanation: req.explanation,
            order: req.order,
        }
    }
}

/// Question with its correct answer, for the host.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionDto {
    /// Question identifier.
    pub id: Uuid,
    /// Prompt text.
    pub question_text: String,
    /// Option A text.
    pub option_a: String,
    /// Option B text.
    pub option_b: String,
    /// Option C text.
    pub option_c: String,
    /// Option D text.
    pub option_d: String,
    /// Correct letter.
    pub correct_answer: AnswerOption,
    /// Explanation.
    pub explanation: String,
    /// Sort key.
    pub order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Question> for QuestionDto {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            option_a: q.option_a.clone(),
            option_b: q.option_b.clone(),
            option_c: q.option_c.clone(),
            option_d: q.option_d.clone(),
            correct_answer: q.correct_answer,
            explanation: q.explanation.clone(),
            order: q.order,
            created_at: q.created_at,
        }
    }
}

/// Question as participants see it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuestionDto {
    /// Question identifier.
    pub id: Uuid,
    /// Prompt text.
    pub question_text: String,
    /// Option A text.
    pub option_a: String,
    /// Option B text.
    pub option_b: String,
    /// Option C text.
    pub option_c: String,
    /// Option D text.
    pub option_d: String,
    /// Sort key.
    pub order: i32,
}

impl From<&Question> for PublicQuestionDto {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            option_a: q.option_a.clone(),
            option_b: q.option_b.clone(),
            option_c: q.option_c.clone(),
            option_d: q.option_d.clone(),
            order: q.order,
        }
    }
}

/// Response body for `GET /api/quiz/host/{id}/questions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionListResponse {
    /// Questions in order.
    pub data: Vec<QuestionDto>,
}

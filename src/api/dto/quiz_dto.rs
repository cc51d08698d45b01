//! Quiz DTOs for create, detail, confirm, and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::question_dto::{PublicQuestionDto, QuestionDto};
use crate::domain::{Difficulty, Quiz, QuizStatus};
use crate::service::{NewQuiz, QuizOverview};

/// Request body for `POST /api/quiz/host`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuizRequest {
    /// Title (1 to 200 characters).
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Difficulty; defaults to `medium`.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Seconds per question; defaults to 30.
    #[serde(default)]
    pub time_per_question: Option<i32>,
}

impl From<CreateQuizRequest> for NewQuiz {
    fn from(req: CreateQuizRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            difficulty: req.difficulty,
            time_per_question: req.time_per_question,
        }
    }
}

/// Response body for `POST /api/quiz/host` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateQuizResponse {
    /// The new quiz.
    pub quiz: QuizDto,
    /// Secret for host operations. Shown only once.
    pub host_token: String,
}

/// Request body for `POST /api/quiz/host/{id}/confirm`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfirmQuizRequest {
    /// Replaces the quiz's time per question when present.
    #[serde(default)]
    pub time_per_question: Option<i32>,
}

/// Quiz as returned by the API. Never includes the host token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizDto {
    /// Quiz identifier.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Status.
    pub status: QuizStatus,
    /// Seconds per question.
    pub time_per_question: i32,
    /// Index of the current question while live.
    pub current_question_index: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Session start.
    pub started_at: Option<DateTime<Utc>>,
    /// Session end.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Quiz> for QuizDto {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: *quiz.id.as_uuid(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            difficulty: quiz.difficulty,
            status: quiz.status,
            time_per_question: quiz.time_per_question,
            current_question_index: quiz.current_question_index,
            created_at: quiz.created_at,
            started_at: quiz.started_at,
            completed_at: quiz.completed_at,
        }
    }
}

/// Host detail view, with correct answers.
#[derive(Debug, Serialize, ToSchema)]
pub struct HostQuizDetail {
    /// The quiz.
    #[serde(flatten)]
    pub quiz: QuizDto,
    /// Participant count.
    pub participant_count: i64,
    /// Questions in order.
    pub questions: Vec<QuestionDto>,
}

impl From<QuizOverview> for HostQuizDetail {
    fn from(overview: QuizOverview) -> Self {
        Self {
            quiz: QuizDto::from(&overview.quiz),
            participant_count: overview.participant_count,
            questions: overview.questions.iter().map(QuestionDto::from).collect(),
        }
    }
}

/// Public detail view, without correct answers or explanations.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuizDetail {
    /// The quiz.
    #[serde(flatten)]
    pub quiz: QuizDto,
    /// Participant count.
    pub participant_count: i64,
    /// Number of questions.
    pub question_count: usize,
    /// Questions in order, answers stripped.
    pub questions: Vec<PublicQuestionDto>,
}

impl From<QuizOverview> for PublicQuizDetail {
    fn from(overview: QuizOverview) -> Self {
        Self {
            quiz: QuizDto::from(&overview.quiz),
            participant_count: overview.participant_count,
            question_count: overview.questions.len(),
            questions: overview.questions.iter().map(PublicQuestionDto::from).collect(),
        }
    }
}

/// Response body for `GET /api/quiz/public`.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizListResponse {
    /// Joinable quizzes, newest first.
    pub data: Vec<QuizDto>,
}

//! Database row models and their conversion into domain types.
//!
//! Enum columns are stored as text and parsed on the way out, so the same
//! rows decode from both SQLite and PostgreSQL.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::question::AnswerOption;
use crate::domain::{Answer, Participant, Question, Quiz, QuizId};
use crate::error::QuizError;

/// A row from the `quizzes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuizRow {
    /// Primary key.
    pub id: Uuid,
    /// Host secret.
    pub host_token: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// `easy` / `medium` / `hard`.
    pub difficulty: String,
    /// `draft` / `ready` / `live` / `completed`.
    pub status: String,
    /// Seconds per question.
    pub time_per_question: i32,
    /// Current question index.
    pub current_question_index: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Session start.
    pub started_at: Option<DateTime<Utc>>,
    /// Session end.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = QuizError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: QuizId::from_uuid(row.id),
            host_token: row.host_token,
            title: row.title,
            description: row.description,
            difficulty: row.difficulty.parse()?,
            status: row.status.parse()?,
            time_per_question: row.time_per_question,
            current_question_index: row.current_question_index,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// A row from the `questions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning quiz.
    pub quiz_id: Uuid,
    /// Prompt.
    pub question_text: String,
    /// Option A.
    pub option_a: String,
    /// Option B.
    pub option_b: String,
    /// Option C.
    pub option_c: String,
    /// Option D.
    pub option_d: String,
    /// Correct letter.
    pub correct_answer: String,
    /// Explanation.
    pub explanation: String,
    /// Sort key (`order` in the API).
    pub position: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = QuizError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let correct_answer = row
            .correct_answer
            .parse::<AnswerOption>()
            .map_err(|_| QuizError::Internal(format!("question {} has a corrupt answer", row.id)))?;
        Ok(Self {
            id: row.id,
            quiz_id: QuizId::from_uuid(row.quiz_id),
            question_text: row.question_text,
            option_a: row.option_a,
            option_b: row.option_b,
            option_c: row.option_c,
            option_d: row.option_d,
            correct_answer,
            explanation: row.explanation,
            order: row.position,
            created_at: row.created_at,
        })
    }
}

/// A row from the `participants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    /// Primary key.
    pub id: Uuid,
    /// Quiz joined.
    pub quiz_id: Uuid,
    /// Nickname.
    pub nickname: String,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
    /// Cached score total.
    pub total_score: i32,
    /// Cached correct count.
    pub correct_answers: i32,
    /// Cached response time total.
    pub total_response_time: f64,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id,
            quiz_id: QuizId::from_uuid(row.quiz_id),
            nickname: row.nickname,
            joined_at: row.joined_at,
            total_score: row.total_score,
            correct_answers: row.correct_answers,
            total_response_time: row.total_response_time,
        }
    }
}

/// A row from the `answers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerRow {
    /// Primary key.
    pub id: Uuid,
    /// Who answered.
    pub participant_id: Uuid,
    /// Which question.
    pub question_id: Uuid,
    /// Letter, or empty for no answer.
    pub selected_option: String,
    /// Correctness.
    pub is_correct: bool,
    /// Seconds taken.
    pub response_time: f64,
    /// Points.
    pub score: i32,
    /// Submission timestamp.
    pub answered_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for Answer {
    type Error = QuizError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            participant_id: row.participant_id,
            question_id: row.question_id,
            selected_option: AnswerOption::parse_submission(Some(&row.selected_option))?,
            is_correct: row.is_correct,
            response_time: row.response_time,
            score: row.score,
            answered_at: row.answered_at,
        })
    }
}

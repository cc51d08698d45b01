//! Multiple-choice questions and answer options.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::QuizId;
use crate::error::QuizError;

/// Maximum length of a single option's text.
pub const MAX_OPTION_LEN: usize = 500;

/// One of the four answer letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AnswerOption {
    /// Option A.
    A,
    /// Option B.
    B,
    /// Option C.
    C,
    /// Option D.
    D,
}

impl AnswerOption {
    /// Single-letter representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    /// Parses a participant submission. Blank means "no answer".
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for anything other than a
    /// (case-insensitive) `A`–`D` or blank.
    pub fn parse_submission(raw: Option<&str>) -> Result<Option<Self>, QuizError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(QuizError::InvalidRequest(format!(
                "option must be one of A, B, C, D (got {s:?})"
            ))),
        }
    }
}

/// A stored question.
#[derive(Debug, Clone)]
pub struct Question {
    /// Question identifier.
    pub id: uuid::Uuid,
    /// Owning quiz.
    pub quiz_id: QuizId,
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
    /// The correct letter.
    pub correct_answer: AnswerOption,
    /// Shown after the question closes.
    pub explanation: String,
    /// Sort key within the quiz.
    pub order: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Validated question content, used for both creation and full replacement.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    /// Prompt text.
    pub question_text: String,
    /// Option texts in A–D order.
    pub options: [String; 4],
    /// The correct letter.
    pub correct_answer: AnswerOption,
    /// Explanation text.
    pub explanation: String,
    /// Sort key.
    pub order: i32,
}

impl QuestionDraft {
    /// Checks text and option lengths.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] naming the first bad field.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.question_text.trim().is_empty() {
            return Err(QuizError::InvalidRequest(
                "question_text must not be empty".to_string(),
            ));
        }
        for (letter, text) in ["a", "b", "c", "d"].iter().zip(&self.options) {
            let len = text.trim().chars().count();
            if len == 0 || len > MAX_OPTION_LEN {
                return Err(QuizError::InvalidRequest(format!(
                    "option_{letter} must be 1 to {MAX_OPTION_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

impl From<&Question> for QuestionDraft {
    fn from(q: &Question) -> Self {
        Self {
            question_text: q.question_text.clone(),
            options: [
                q.option_a.clone(),
                q.option_b.clone(),
                q.option_c.clone(),
                q.option_d.clone(),
            ],
            correct_answer: q.correct_answer,
            explanation: q.explanation.clone(),
            order: q.order,
        }
    }
}

/// Partial update of a question. `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    /// New prompt text.
    pub question_text: Option<String>,
    /// New option texts, indexed A–D.
    pub options: [Option<String>; 4],
    /// New correct letter.
    pub correct_answer: Option<AnswerOption>,
    /// New explanation.
    pub explanation: Option<String>,
    /// New sort key.
    pub order: Option<i32>,
}

impl QuestionPatch {
    /// Applies the patch on top of `draft`.
    #[must_use]
    pub fn apply(self, mut draft: QuestionDraft) -> QuestionDraft {
        if let Some(text) = self.question_text {
            draft.question_text = text;
        }
        for (slot, value) in draft.options.iter_mut().zip(self.options) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(correct) = self.correct_answer {
            draft.correct_answer = correct;
        }
        if let Some(explanation) = self.explanation {
            draft.explanation = explanation;
        }
        if let Some(order) = self.order {
            draft.order = order;
        }
        draft
    }
}

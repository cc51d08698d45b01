//! Quiz aggregate: status machine, difficulty, and timing settings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::QuizId;
use crate::error::QuizError;

/// Default seconds allowed per question.
pub const DEFAULT_TIME_PER_QUESTION: i32 = 30;

/// Upper bound on `time_per_question`.
pub const MAX_TIME_PER_QUESTION: i32 = 3600;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Lifecycle status of a quiz.
///
/// `Draft → Ready → Live → Completed`. Questions can be edited while
/// `Draft` or `Ready`; participants can join while `Ready` or `Live`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    /// Being authored.
    Draft,
    /// Confirmed and waiting for the host to start.
    Ready,
    /// Session in progress.
    Live,
    /// Session finished; leaderboard is final.
    Completed,
}

impl QuizStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Live => "live",
            Self::Completed => "completed",
        }
    }

    /// Whether questions may be added, edited or removed.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Ready)
    }

    /// Whether new participants may join.
    #[must_use]
    pub const fn is_joinable(&self) -> bool {
        matches!(self, Self::Ready | Self::Live)
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizStatus {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "ready" => Ok(Self::Ready),
            "live" => Ok(Self::Live),
            "completed" => Ok(Self::Completed),
            other => Err(QuizError::Internal(format!("unknown quiz status {other:?}"))),
        }
    }
}

/// Advertised difficulty of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Easy.
    Easy,
    /// Medium (default).
    #[default]
    Medium,
    /// Hard.
    Hard,
}

impl Difficulty {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(QuizError::Internal(format!("unknown difficulty {other:?}"))),
        }
    }
}

/// A quiz with its session state.
///
/// `host_token` authorizes host-only operations and is never part of any
/// public serialization.
#[derive(Debug, Clone)]
pub struct Quiz {
    /// Quiz identifier.
    pub id: QuizId,
    /// Opaque secret for host operations.
    pub host_token: String,
    /// Title shown to participants.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Advertised difficulty.
    pub difficulty: Difficulty,
    /// Lifecycle status.
    pub status: QuizStatus,
    /// Seconds allowed per question; also the scoring window.
    pub time_per_question: i32,
    /// Index of the question currently shown (synchronized progression).
    pub current_question_index: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last mutation.
    pub updated_at: DateTime<Utc>,
    /// When the host started the session.
    pub started_at: Option<DateTime<Utc>>,
    /// When the session completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Quiz {
    /// Returns `Ok(())` when `token` is this quiz's host token.
    ///
    /// # Errors
    ///
    /// [`QuizError::Unauthorized`] when no token was supplied and
    /// [`QuizError::Forbidden`] when it does not match.
    pub fn authorize_host(&self, token: Option<&str>, action: &str) -> Result<(), QuizError> {
        match token {
            None | Some("") => Err(QuizError::Unauthorized(format!(
                "host token required to {action}"
            ))),
            Some(t) if t == self.host_token => Ok(()),
            Some(_) => Err(QuizError::Forbidden(format!("only the host can {action}"))),
        }
    }

    /// Fails with [`QuizError::Conflict`] unless the quiz is in `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Conflict`] describing the actual status.
    pub fn require_status(&self, expected: QuizStatus) -> Result<(), QuizError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(QuizError::Conflict(format!(
                "quiz is {} (expected {expected})",
                self.status
            )))
        }
    }
}

/// Validates a quiz title.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] if empty or too long.
pub fn validate_title(title: &str) -> Result<String, QuizError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(QuizError::InvalidRequest("title must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(QuizError::InvalidRequest(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validates `time_per_question`.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] if outside `1..=3600`.
pub fn validate_time_per_question(seconds: i32) -> Result<i32, QuizError> {
    if (1..=MAX_TIME_PER_QUESTION).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(QuizError::InvalidRequest(format!(
            "time_per_question must be between 1 and {MAX_TIME_PER_QUESTION} seconds"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_quiz(status: QuizStatus) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: QuizId::new(),
            host_token: "tok".to_string(),
            title: "Rust basics".to_string(),
            description: String::new(),
            difficulty: Difficulty::Medium,
            status,
            time_per_question: DEFAULT_TIME_PER_QUESTION,
            current_question_index: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            QuizStatus::Draft,
            QuizStatus::Ready,
            QuizStatus::Live,
            QuizStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<QuizStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn editable_and_joinable_windows() {
        assert!(QuizStatus::Draft.is_editable());
        assert!(!QuizStatus::Live.is_editable());
        assert!(!QuizStatus::Draft.is_joinable());
        assert!(QuizStatus::Live.is_joinable());
        assert!(!QuizStatus::Completed.is_joinable());
    }

    #[test]
    fn host_authorization() {
        let quiz = make_quiz(QuizStatus::Ready);
        assert!(quiz.authorize_host(Some("tok"), "start").is_ok());
        assert!(matches!(
            quiz.authorize_host(None, "start"),
            Err(QuizError::Unauthorized(_))
        ));
        assert!(matches!(
            quiz.authorize_host(Some("other"), "start"),
            Err(QuizError::Forbidden(_))
        ));
    }

    #[test]
    fn require_status_reports_actual() {
        let quiz = make_quiz(QuizStatus::Draft);
        let Err(err) = quiz.require_status(QuizStatus::Live) else {
            unreachable!("draft is not live");
        };
        assert_eq!(err.to_string(), "quiz is draft (expected live)");
    }

    #[test]
    fn title_validation() {
        assert_eq!(validate_title("  Trivia  ").ok().as_deref(), Some("Trivia"));
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn time_per_question_bounds() {
        assert!(validate_time_per_question(0).is_err());
        assert!(validate_time_per_question(30).is_ok());
        assert!(validate_time_per_question(3601).is_err());
    }
}

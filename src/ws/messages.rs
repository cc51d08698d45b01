//! WebSocket message types for the live quiz protocol.
//!
//! Both directions are flat JSON objects discriminated by a `type` field,
//! e.g. `{"type": "join", "nickname": "ana"}`.

use serde::{Deserialize, Serialize};

use crate::domain::{LeaderboardEntry, Question, Quiz, QuizId, QuizStatus};

/// Messages a client can send over the quiz socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join (or rejoin) the quiz under a nickname.
    Join {
        /// Display name, unique per quiz.
        nickname: String,
    },
    /// Host: start the session and broadcast the first question.
    StartQuiz,
    /// Host: advance to the next question, completing after the last.
    NextQuestion,
    /// Host: finish the session immediately.
    EndQuiz,
    /// Submit (or replace) an answer to a question.
    SubmitAnswer {
        /// Nickname used when joining.
        nickname: String,
        /// Question being answered.
        question_id: uuid::Uuid,
        /// `A`–`D`; absent or blank when the timer ran out.
        #[serde(default)]
        selected_option: Option<String>,
        /// Seconds taken to answer.
        #[serde(default)]
        response_time: f64,
    },
    /// Request the current leaderboard for this socket only.
    GetLeaderboard,
    /// Keep-alive.
    Ping,
}

/// Snapshot of a quiz sent to a socket on connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizStateData {
    /// Quiz identifier.
    pub id: QuizId,
    /// Title.
    pub title: String,
    /// Current status.
    pub status: QuizStatus,
    /// Number of participants who joined.
    pub participant_count: i64,
    /// Seconds allowed per question.
    pub time_per_question: i32,
}

impl QuizStateData {
    /// Builds the snapshot from a quiz and its participant count.
    #[must_use]
    pub fn new(quiz: &Quiz, participant_count: i64) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            status: quiz.status,
            participant_count,
            time_per_question: quiz.time_per_question,
        }
    }
}

/// A question as shown to participants (no correct answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    /// Question identifier, echoed back in `submit_answer`.
    pub id: uuid::Uuid,
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
    /// Sort key within the quiz.
    pub order: i32,
    /// Position in the live sequence (0-based).
    pub index: i32,
}

impl QuestionPayload {
    /// Strips the answer from `question` and tags it with `index`.
    #[must_use]
    pub fn new(question: &Question, index: i32) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text.clone(),
            option_a: question.option_a.clone(),
            option_b: question.option_b.clone(),
            option_c: question.option_c.clone(),
            option_d: question.option_d.clone(),
            order: question.order,
            index,
        }
    }
}

/// Messages the server sends to a quiz socket.
///
/// Group broadcasts travel through the channel layer as this type, so it
/// is both `Serialize` and `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Quiz snapshot, sent on connect.
    QuizState {
        /// Snapshot body.
        data: QuizStateData,
    },
    /// Participant count changed.
    ParticipantUpdate {
        /// New participant count.
        participant_count: i64,
    },
    /// The current question, synchronized across all sockets.
    Question {
        /// Question body.
        question: QuestionPayload,
        /// Seconds allowed.
        time_limit: i32,
    },
    /// Leaderboard, both on request and after every scored answer.
    Leaderboard {
        /// Ranked entries.
        data: Vec<LeaderboardEntry>,
    },
    /// Session finished.
    QuizCompleted {
        /// Final ranked entries.
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// Private confirmation of a scored answer.
    AnswerAck {
        /// Question answered.
        question_id: uuid::Uuid,
        /// Whether it was correct.
        is_correct: bool,
        /// Points for this answer.
        score: i32,
        /// Participant's new total.
        total_score: i32,
    },
    /// Reply to `ping`.
    Pong,
    /// Something went wrong handling the last client message.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Convenience constructor for [`ServerMessage::Error`].
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serializes to the JSON text frame sent to the client.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize server message");
            r#"{"type":"error","message":"internal serialization error"}"#.to_string()
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_unit_commands() {
        let Ok(msg) = serde_json::from_str::<ClientMessage>(r#"{"type":"start_quiz"}"#) else {
            panic!("start_quiz should parse");
        };
        assert_eq!(msg, ClientMessage::StartQuiz);
    }

    #[test]
    fn submit_answer_defaults_optional_fields() {
        let id = uuid::Uuid::new_v4();
        let text = format!(r#"{{"type":"submit_answer","nickname":"ana","question_id":"{id}"}}"#);
        let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) else {
            panic!("submit_answer should parse");
        };
        assert_eq!(
            msg,
            ClientMessage::SubmitAnswer {
                nickname: "ana".to_string(),
                question_id: id,
                selected_option: None,
                response_time: 0.0,
            }
        );
    }

    #[test]
    fn integer_response_time_is_accepted() {
        let id = uuid::Uuid::new_v4();
        let text = format!(
            r#"{{"type":"submit_answer","nickname":"ana","question_id":"{id}","selected_option":"b","response_time":7}}"#
        );
        let parsed = serde_json::from_str::<ClientMessage>(&text);
        assert!(matches!(
            parsed,
            Ok(ClientMessage::SubmitAnswer { response_time, .. }) if (response_time - 7.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn pong_is_flat() {
        assert_eq!(ServerMessage::Pong.to_json(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn participant_update_shape() {
        let json = ServerMessage::ParticipantUpdate {
            participant_count: 3,
        }
        .to_json();
        assert_eq!(json, r#"{"type":"participant_update","participant_count":3}"#);
    }

    #[test]
    fn error_shape() {
        let json = ServerMessage::error("Invalid JSON").to_json();
        assert_eq!(json, r#"{"type":"error","message":"Invalid JSON"}"#);
    }
}

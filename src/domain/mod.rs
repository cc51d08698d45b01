//! Domain layer: quiz model, scoring, and per-quiz locking.
//!
//! This module contains the server-side domain model: quiz identity and
//! status machine, questions and answer letters, participants and the
//! leaderboard ordering, the scoring formula, and the lock registry that
//! serializes mutations on a single quiz.

pub mod participant;
pub mod question;
pub mod quiz;
pub mod quiz_id;
pub mod quiz_locks;
pub mod scoring;

pub use participant::{Answer, LeaderboardEntry, Participant};
pub use question::{AnswerOption, Question, QuestionDraft, QuestionPatch};
pub use quiz::{Difficulty, Quiz, QuizStatus};
pub use quiz_id::QuizId;
pub use quiz_locks::{QuizGuard, QuizLocks};

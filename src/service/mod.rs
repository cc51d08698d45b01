//! Service layer: business logic orchestration.
//!
//! [`QuizService`] runs every quiz operation against the
//! [`crate::persistence::QuizStore`] and broadcasts the resulting events
//! through the [`crate::channels::ChannelLayer`].

pub mod quiz_service;

pub use quiz_service::{
    JoinOutcome, NewQuiz, QuizOverview, QuizService, SessionSnapshot, SubmitOutcome, Submission,
};

//! Persistence layer: SQLite or PostgreSQL through one query surface.
//!
//! The database is the source of truth for quizzes, questions,
//! participants and answers. [`Database`] holds whichever pool is
//! configured and [`QuizStore`] runs the queries against it.

pub mod database;
pub mod models;
pub mod store;

pub use database::Database;
pub use store::QuizStore;

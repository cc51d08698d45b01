//! # livequiz-server
//!
//! REST API and WebSocket server for hosting live multiple-choice quizzes.
//!
//! Hosts author quizzes over REST and run the session over a WebSocket;
//! participants join by nickname, answer against the clock, and watch the
//! leaderboard update live. Real-time events fan out through a channel
//! layer, in-process or on Redis pub/sub, so several server processes can
//! serve one quiz.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── QuizService (service/)
//!     ├── QuizLocks, scoring (domain/)
//!     │
//!     ├── ChannelLayer (channels/) ── in-memory | Redis
//!     │
//!     └── QuizStore (persistence/) ── SQLite | PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod channels;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod server;
pub mod service;
pub mod ws;

//! Data Transfer Objects for REST request/response serialization.
//!
//! Host views carry correct answers and the host token; public views never
//! do.

pub mod common_dto;
pub mod participant_dto;
pub mod question_dto;
pub mod quiz_dto;

pub use common_dto::*;
pub use participant_dto::*;
pub use question_dto::*;
pub use quiz_dto::*;

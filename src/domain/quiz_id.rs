//! Type-safe quiz identifier.
//!
//! [`QuizId`] is a newtype wrapper around [`uuid::Uuid`] (v4) so that quiz
//! identifiers cannot be confused with question or participant UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a quiz.
///
/// Generated once at creation time and immutable thereafter. Used as the
/// primary key, the WebSocket route parameter, and the source of the quiz's
/// channel-layer group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(uuid::Uuid);

impl QuizId {
    /// Creates a new random `QuizId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `QuizId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Channel-layer group that every socket watching this quiz joins.
    #[must_use]
    pub fn group_name(&self) -> String {
        format!("quiz_{}", self.0)
    }
}

impl Default for QuizId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QuizId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<uuid::Uuid>().map(Self)
    }
}

impl From<uuid::Uuid> for QuizId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<QuizId> for uuid::Uuid {
    fn from(id: QuizId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(QuizId::new(), QuizId::new());
    }

    #[test]
    fn group_name_is_channel_safe() {
        let id = QuizId::new();
        let group = id.group_name();
        assert!(group.starts_with("quiz_"));
        assert!(
            group
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }

    #[test]
    fn parses_from_route_segment() {
        let uuid = uuid::Uuid::new_v4();
        let Ok(id) = uuid.to_string().parse::<QuizId>() else {
            panic!("valid uuid should parse");
        };
        assert_eq!(*id.as_uuid(), uuid);
        assert!("not-a-quiz".parse::<QuizId>().is_err());
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = QuizId::new();
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{id}\""));
    }
}

//! Channel layer: group fan-out of real-time events to WebSocket sockets.
//!
//! Each socket registers a channel (its inbox) and joins the group of the
//! quiz it watches. Services broadcast by sending to a group. The backend
//! is chosen at startup:
//!
//! - [`InMemoryChannelLayer`]: one process, lost on restart.
//! - [`RedisChannelLayer`]: Redis pub/sub across any number of processes.

pub mod in_memory;
pub mod redis_layer;

pub use in_memory::InMemoryChannelLayer;
pub use redis_layer::RedisChannelLayer;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ChannelBackend;
use crate::error::QuizError;
use crate::ws::messages::ServerMessage;

/// Maximum group name length.
pub const MAX_GROUP_NAME_LEN: usize = 100;

/// The configured channel layer.
#[derive(Debug, Clone)]
pub enum ChannelLayer {
    /// In-process delivery.
    InMemory(InMemoryChannelLayer),
    /// Redis pub/sub delivery.
    Redis(RedisChannelLayer),
}

impl ChannelLayer {
    /// Builds the layer selected by `backend`.
    ///
    /// The in-memory backend never touches the network. The Redis backend
    /// connects immediately and also returns the listener task handle.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::ChannelLayer`] if Redis is selected and
    /// unreachable.
    pub async fn from_backend(
        backend: &ChannelBackend,
        capacity: usize,
    ) -> Result<(Self, Option<JoinHandle<()>>), QuizError> {
        match backend {
            ChannelBackend::InMemory => Ok((Self::in_memory(capacity), None)),
            ChannelBackend::Redis { url, prefix } => {
                let (layer, listener) = RedisChannelLayer::connect(url, prefix, capacity)
                    .await
                    .map_err(|e| {
                        QuizError::ChannelLayer(format!(
                            "{e}; start Redis on {url} or set USE_REDIS=False"
                        ))
                    })?;
                Ok((Self::Redis(layer), Some(listener)))
            }
        }
    }

    /// Shorthand for an in-memory layer.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self::InMemory(InMemoryChannelLayer::new(capacity))
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in_memory",
            Self::Redis(_) => "redis",
        }
    }

    /// `false` while the Redis listener is resubscribing; the in-memory
    /// layer is always healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        match self {
            Self::InMemory(_) => true,
            Self::Redis(layer) => layer.is_subscribed(),
        }
    }

    /// Registers a new inbox.
    pub async fn new_channel(&self) -> (String, mpsc::Receiver<ServerMessage>) {
        match self {
            Self::InMemory(layer) => layer.new_channel().await,
            Self::Redis(layer) => layer.new_channel().await,
        }
    }

    /// Removes an inbox and all its memberships.
    pub async fn close_channel(&self, channel: &str) {
        match self {
            Self::InMemory(layer) => layer.close_channel(channel).await,
            Self::Redis(layer) => layer.close_channel(channel).await,
        }
    }

    /// Adds `channel` to `group`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_add(&self, group: &str, channel: &str) -> Result<(), QuizError> {
        match self {
            Self::InMemory(layer) => layer.group_add(group, channel).await,
            Self::Redis(layer) => layer.group_add(group, channel).await,
        }
    }

    /// Removes `channel` from `group`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_discard(&self, group: &str, channel: &str) -> Result<(), QuizError> {
        match self {
            Self::InMemory(layer) => layer.group_discard(group, channel).await,
            Self::Redis(layer) => layer.group_discard(group, channel).await,
        }
    }

    /// Sends `message` to every member of `group`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name, or
    /// [`QuizError::ChannelLayer`] if the Redis publish fails.
    pub async fn group_send(&self, group: &str, message: &ServerMessage) -> Result<usize, QuizError> {
        match self {
            Self::InMemory(layer) => layer.group_send(group, message).await,
            Self::Redis(layer) => layer.group_send(group, message).await,
        }
    }
}

/// Checks a group name: non-empty, shorter than [`MAX_GROUP_NAME_LEN`], and
/// only ASCII alphanumerics, `-`, `_` or `.`.
///
/// # Errors
///
/// Returns [`QuizError::InvalidRequest`] describing the violation.
pub fn validate_group_name(group: &str) -> Result<(), QuizError> {
    if group.is_empty() || group.len() >= MAX_GROUP_NAME_LEN {
        return Err(QuizError::InvalidRequest(format!(
            "group name must be 1 to {} characters",
            MAX_GROUP_NAME_LEN - 1
        )));
    }
    if !group
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(QuizError::InvalidRequest(format!(
            "group name {group:?} contains invalid characters"
        )));
    }
    Ok(())
}

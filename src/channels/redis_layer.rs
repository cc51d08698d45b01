//! Redis-backed channel layer.
//!
//! `group_send` publishes a JSON [`GroupEnvelope`] to `{prefix}:{group}`.
//! Every server process runs one listener that pattern-subscribes to
//! `{prefix}:*` and hands each envelope to its local members through an
//! embedded [`InMemoryChannelLayer`]. The publisher receives its own message
//! back through the subscription, so local members are served exactly once.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, PubSub};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::in_memory::InMemoryChannelLayer;
use super::validate_group_name;
use crate::error::QuizError;
use crate::ws::messages::ServerMessage;

/// Wait before the first resubscribe attempt.
pub const RESUBSCRIBE_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on the wait between resubscribe attempts.
pub const RESUBSCRIBE_MAX_DELAY: Duration = Duration::from_secs(30);

/// Wire format of a published group message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEnvelope {
    /// Target group.
    pub group: String,
    /// Message to deliver.
    pub message: ServerMessage,
}

/// Cross-process channel layer on Redis pub/sub.
#[derive(Clone)]
pub struct RedisChannelLayer {
    local: InMemoryChannelLayer,
    publisher: ConnectionManager,
    prefix: String,
    subscribed: Arc<AtomicBool>,
}

impl fmt::Debug for RedisChannelLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisChannelLayer")
            .field("local", &self.local)
            .field("prefix", &self.prefix)
            .field("subscribed", &self.is_subscribed())
            .finish_non_exhaustive()
    }
}

impl RedisChannelLayer {
    /// Connects to Redis, subscribes to the prefix pattern, and spawns the
    /// listener task.
    ///
    /// The listener resubscribes with exponential backoff whenever the
    /// subscription drops; [`Self::is_subscribed`] is `false` meanwhile.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::ChannelLayer`] if Redis is unreachable or the
    /// subscription fails.
    pub async fn connect(
        url: &str,
        prefix: &str,
        capacity: usize,
    ) -> Result<(Self, JoinHandle<()>), QuizError> {
        let client = redis::Client::open(url)?;
        let pattern = format!("{prefix}:*");

        // Pub/sub needs a dedicated connection rather than the multiplexed
        // one. It is opened first since it fails fast when Redis is down,
        // while the connection manager retries with backoff.
        let pubsub = subscribe(&client, &pattern).await?;
        tracing::info!(%pattern, "subscribed to redis channel layer");

        let publisher = ConnectionManager::new(client.clone()).await?;

        let local = InMemoryChannelLayer::new(capacity);
        let subscribed = Arc::new(AtomicBool::new(true));
        let listener = tokio::spawn(run_listener(
            Listener {
                client,
                pattern,
                channel_prefix: format!("{prefix}:"),
                local: local.clone(),
                subscribed: Arc::clone(&subscribed),
            },
            pubsub,
        ));

        Ok((
            Self {
                local,
                publisher,
                prefix: prefix.to_string(),
                subscribed,
            },
            listener,
        ))
    }

    /// Whether the listener currently holds a live subscription.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Acquire)
    }

    /// Registers a new local inbox.
    pub async fn new_channel(&self) -> (String, mpsc::Receiver<ServerMessage>) {
        self.local.new_channel().await
    }

    /// Removes a local inbox and its memberships.
    pub async fn close_channel(&self, channel: &str) {
        self.local.close_channel(channel).await;
    }

    /// Adds a local channel to `group`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_add(&self, group: &str, channel: &str) -> Result<(), QuizError> {
        self.local.group_add(group, channel).await
    }

    /// Removes a local channel from `group`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_discard(&self, group: &str, channel: &str) -> Result<(), QuizError> {
        self.local.group_discard(group, channel).await
    }

    /// Publishes `message` to every process; returns the number of
    /// subscribed processes that received it.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name and
    /// [`QuizError::ChannelLayer`] if serialization or the publish fails.
    pub async fn group_send(&self, group: &str, message: &ServerMessage) -> Result<usize, QuizError> {
        validate_group_name(group)?;
        let envelope = GroupEnvelope {
            group: group.to_string(),
            message: message.clone(),
        };
        let payload =
            serde_json::to_string(&envelope).map_err(|e| QuizError::ChannelLayer(e.to_string()))?;
        let mut conn = self.publisher.clone();
        let receivers: usize = conn
            .publish(redis_channel(&self.prefix, group), payload)
            .await?;
        Ok(receivers)
    }
}

/// State owned by the listener task.
struct Listener {
    client: redis::Client,
    pattern: String,
    channel_prefix: String,
    local: InMemoryChannelLayer,
    subscribed: Arc<AtomicBool>,
}

/// Forwards published envelopes to local members and resubscribes after
/// every disconnect. Runs until aborted.
async fn run_listener(listener: Listener, mut pubsub: PubSub) {
    loop {
        forward(&listener, &mut pubsub).await;
        listener.subscribed.store(false, Ordering::Release);
        tracing::warn!(pattern = %listener.pattern, "redis subscription lost, resubscribing");
        pubsub = resubscribe(&listener.client, &listener.pattern).await;
        listener.subscribed.store(true, Ordering::Release);
        tracing::info!(pattern = %listener.pattern, "redis subscription restored");
    }
}

async fn forward(listener: &Listener, pubsub: &mut PubSub) {
    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to read redis payload");
                continue;
            }
        };
        let Some(envelope) =
            decode_envelope(msg.get_channel_name(), &listener.channel_prefix, &payload)
        else {
            continue;
        };
        if let Err(e) = listener
            .local
            .group_send(&envelope.group, &envelope.message)
            .await
        {
            tracing::warn!(error = %e, group = %envelope.group, "dropped redis group message");
        }
    }
}

async fn subscribe(client: &redis::Client, pattern: &str) -> redis::RedisResult<PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(pattern).await?;
    Ok(pubsub)
}

/// Retries [`subscribe`] until it succeeds.
async fn resubscribe(client: &redis::Client, pattern: &str) -> PubSub {
    let mut delay = RESUBSCRIBE_INITIAL_DELAY;
    loop {
        tokio::time::sleep(delay).await;
        match subscribe(client, pattern).await {
            Ok(pubsub) => return pubsub,
            Err(e) => {
                delay = next_delay(delay);
                tracing::warn!(error = %e, retry_in_ms = delay.as_millis(), "redis resubscribe failed");
            }
        }
    }
}

/// Doubles `current`, capped at [`RESUBSCRIBE_MAX_DELAY`].
#[must_use]
pub fn next_delay(current: Duration) -> Duration {
    current.saturating_mul(2).min(RESUBSCRIBE_MAX_DELAY)
}

/// Redis channel that carries messages for `group`.
#[must_use]
pub fn redis_channel(prefix: &str, group: &str) -> String {
    format!("{prefix}:{group}")
}

/// Parses a received payload, checking that the channel it arrived on
/// matches the envelope's group.
fn decode_envelope(channel: &str, prefix: &str, payload: &str) -> Option<GroupEnvelope> {
    let group = channel.strip_prefix(prefix)?;
    match serde_json::from_str::<GroupEnvelope>(payload) {
        Ok(envelope) if envelope.group == group => Some(envelope),
        Ok(envelope) => {
            tracing::warn!(%channel, group = %envelope.group, "envelope group mismatch");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, %channel, "malformed channel layer envelope");
            None
        }
    }
}

//! In-process channel layer.
//!
//! Every connection owns a bounded [`tokio::sync::mpsc`] inbox registered
//! under a unique channel name. Groups are sets of channel names. Delivery
//! only reaches connections in this process and nothing survives a restart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use super::validate_group_name;
use crate::error::QuizError;
use crate::ws::messages::ServerMessage;

#[derive(Debug, Default)]
struct LayerState {
    channels: HashMap<String, mpsc::Sender<ServerMessage>>,
    groups: HashMap<String, HashSet<String>>,
}

/// Single-process channel layer.
///
/// Cheap to clone; clones share the same channel and group tables.
#[derive(Debug, Clone)]
pub struct InMemoryChannelLayer {
    state: Arc<RwLock<LayerState>>,
    capacity: usize,
}

impl InMemoryChannelLayer {
    /// Creates a layer whose per-channel inboxes hold `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(LayerState::default())),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new inbox and returns its name and receiving end.
    pub async fn new_channel(&self) -> (String, mpsc::Receiver<ServerMessage>) {
        let name = format!("specific.{}", uuid::Uuid::new_v4().simple());
        let (tx, rx) = mpsc::channel(self.capacity);
        self.state.write().await.channels.insert(name.clone(), tx);
        (name, rx)
    }

    /// Removes an inbox and its group memberships.
    pub async fn close_channel(&self, channel: &str) {
        let mut state = self.state.write().await;
        state.channels.remove(channel);
        state.groups.retain(|_, members| {
            members.remove(channel);
            !members.is_empty()
        });
    }

    /// Adds `channel` to `group`.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_add(&self, group: &str, channel: &str) -> Result<(), QuizError> {
        validate_group_name(group)?;
        self.state
            .write()
            .await
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(channel.to_string());
        Ok(())
    }

    /// Removes `channel` from `group`. Unknown members are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_discard(&self, group: &str, channel: &str) -> Result<(), QuizError> {
        validate_group_name(group)?;
        let mut state = self.state.write().await;
        if let Some(members) = state.groups.get_mut(group) {
            members.remove(channel);
            if members.is_empty() {
                state.groups.remove(group);
            }
        }
        Ok(())
    }

    /// Delivers `message` to every channel in `group`.
    ///
    /// A full inbox drops the message for that channel only; a closed
    /// inbox is pruned. Returns the number of channels that accepted it.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::InvalidRequest`] for an invalid group name.
    pub async fn group_send(&self, group: &str, message: &ServerMessage) -> Result<usize, QuizError> {
        validate_group_name(group)?;

        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let state = self.state.read().await;
            let Some(members) = state.groups.get(group) else {
                return Ok(0);
            };
            for member in members {
                let Some(tx) = state.channels.get(member) else {
                    closed.push(member.clone());
                    continue;
                };
                match tx.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(%group, channel = %member, "channel full, message dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(member.clone()),
                }
            }
        }

        for channel in &closed {
            self.close_channel(channel).await;
        }

        Ok(delivered)
    }

    /// Number of channels currently in `group`.
    #[cfg(test)]
    pub(crate) async fn group_size(&self, group: &str) -> usize {
        self.state
            .read()
            .await
            .groups
            .get(group)
            .map_or(0, HashSet::len)
    }
}

//! Where an invocation's outgoing messages go.

use std::sync::Arc;

use async_trait::async_trait;
use cnbchat_core::channel::Channel;
use cnbchat_core::error::ChannelError;
use tokio::sync::mpsc;

/// Receives the messages of one invocation, in order.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), ChannelError>;
}

#[async_trait]
impl ReplySink for mpsc::Sender<String> {
    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        mpsc::Sender::send(self, text.to_string())
            .await
            .map_err(|_| ChannelError::ConnectionLost("reply receiver dropped".into()))
    }
}

/// Replies to one chat of a [`Channel`].
pub struct ChannelReply {
    channel: Arc<dyn Channel>,
    chat_id: String,
}

impl ChannelReply {
    pub fn new(channel: Arc<dyn Channel>, chat_id: impl Into<String>) -> Self {
        Self {
            channel,
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl ReplySink for ChannelReply {
    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        self.channel.send(&self.chat_id, text).await
    }
}

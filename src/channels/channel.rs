//! The `Channel` trait — pure transport I/O, no dialogue logic.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::dialogue::OutgoingReply;
use crate::error::ChannelError;

/// Stream of inbound messages produced by a running channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Unified inbound message from any channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Unique id for logging/tracing.
    pub id: Uuid,
    /// Source channel: "telegram", "cli".
    pub channel: String,
    /// Stable chat identity the dialogue session is keyed by.
    pub sender: String,
    /// Sender's first name, when the transport provides one.
    pub sender_name: Option<String>,
    /// Sender's last name, when the transport provides one.
    pub sender_last_name: Option<String>,
    /// Message text (typed or a tapped reply button).
    pub content: String,
    /// Channel-specific metadata needed for replying.
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, sender: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender: sender.to_string(),
            sender_name: None,
            sender_last_name: None,
            content: content.to_string(),
            metadata: serde_json::json!({}),
            received_at: Utc::now(),
        }
    }

    pub fn with_sender_name(mut self, name: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self
    }

    pub fn with_sender_last_name(mut self, name: &str) -> Self {
        self.sender_last_name = Some(name.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this is the session-initiation command.
    pub fn is_start(&self) -> bool {
        self.content.trim() == "/start"
    }
}

/// Trait for transports: deliver inbound events, accept outbound replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Start listening and return the inbound message stream.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver one reply (text, suggested reply labels, optional document)
    /// back to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        reply: &OutgoingReply,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

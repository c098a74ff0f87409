//! Messaging platform adapters
//!
//! The bot talks to the platform through the `MessagingApi` trait so handlers
//! can be driven against a recording mock in tests.

pub mod line;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub use line::LineClient;
pub use line::types::{EventSource, Profile, SendMessage};

use crate::Result;

/// Chunks of a downloaded attachment
pub type ContentStream = BoxStream<'static, Result<Bytes>>;

/// Outbound calls the bot makes to the messaging platform
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Reply to an event using its single-use reply token
    async fn reply(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()>;

    /// Look up a user's profile
    async fn profile(&self, user_id: &str) -> Result<Profile>;

    /// Stream the binary content of a message (image, video, ...)
    async fn message_content(&self, message_id: &str) -> Result<ContentStream>;
}

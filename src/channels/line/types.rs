//! LINE Messaging API wire types

use serde::{Deserialize, Serialize};

use crate::error::LineErrorDetail;

/// Webhook request body
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    /// Bot user ID the events are addressed to
    #[serde(default)]
    pub destination: Option<String>,
    /// Events in delivery order
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// One webhook event, as delivered
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event type discriminated by the `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    Message { message: MessageContent },
    Postback { postback: PostbackContent },
    /// follow, unfollow, join, leave, unsend, ...
    #[serde(other)]
    Other,
}

/// Message payload of a `message` event
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MessageContent {
    Text {
        id: String,
        text: String,
    },
    Image {
        id: String,
    },
    Location {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        address: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    Sticker {
        id: String,
        package_id: String,
        sticker_id: String,
    },
    /// video, audio, file
    #[serde(other)]
    Other,
}

/// Payload of a `postback` event
#[derive(Debug, Deserialize)]
pub struct PostbackContent {
    pub data: String,
}

/// Where an event came from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventSource {
    User {
        user_id: String,
    },
    Group {
        group_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    Room {
        room_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
}

impl EventSource {
    /// User ID, only for one-on-one chats with a user
    #[must_use]
    pub fn direct_user_id(&self) -> Option<&str> {
        match self {
            Self::User { user_id } => Some(user_id),
            Self::Group { .. } | Self::Room { .. } => None,
        }
    }
}

/// Outgoing message object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SendMessage {
    Text {
        text: String,
    },
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
    Location {
        title: String,
        address: String,
        latitude: f64,
        longitude: f64,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
    },
}

impl SendMessage {
    /// Text message
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image message using the same URL for original and preview
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Image {
            original_content_url: url.clone(),
            preview_image_url: url,
        }
    }
}

/// Body of `POST /v2/bot/message/reply`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [SendMessage],
}

/// User profile returned by `GET /v2/bot/profile/{userId}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    pub user_id: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

/// Error body returned by the Messaging API
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<LineErrorDetail>,
}

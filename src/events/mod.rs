//! Inbound events the bot reacts to
//!
//! The webhook envelope is parsed into LINE wire types first, then narrowed to
//! the closed set of events the bot handles. Everything else is dropped here.

use crate::channels::line::types::{EventKind, MessageContent, WebhookEvent};
use crate::channels::EventSource;

/// An event the bot handles, with the data needed to reply to it
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Single-use token for the correlated reply
    pub reply_token: String,
    /// Chat the event came from
    pub source: EventSource,
    /// Event-specific payload
    pub payload: EventPayload,
}

/// Payload of a handled event
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Plain text message
    Text { text: String },
    /// Image attachment, fetched by message id
    Image { message_id: String },
    /// Shared location
    Location {
        title: Option<String>,
        address: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    /// Sticker
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    /// Postback from an action button
    Postback { data: String },
}

impl EventPayload {
    /// Short name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Location { .. } => "location",
            Self::Sticker { .. } => "sticker",
            Self::Postback { .. } => "postback",
        }
    }
}

impl InboundEvent {
    /// Narrow a raw webhook event to a handled one
    ///
    /// Returns `None` for unhandled event or message types, and for events
    /// without a reply token or source.
    #[must_use]
    pub fn from_webhook(event: WebhookEvent) -> Option<Self> {
        let payload = match event.kind {
            EventKind::Message { message } => match message {
                MessageContent::Text { text, .. } => EventPayload::Text { text },
                MessageContent::Image { id } => EventPayload::Image { message_id: id },
                MessageContent::Location {
                    title,
                    address,
                    latitude,
                    longitude,
                    ..
                } => EventPayload::Location {
                    title,
                    address,
                    latitude,
                    longitude,
                },
                MessageContent::Sticker {
                    package_id,
                    sticker_id,
                    ..
                } => EventPayload::Sticker {
                    package_id,
                    sticker_id,
                },
                MessageContent::Other => return None,
            },
            EventKind::Postback { postback } => EventPayload::Postback {
                data: postback.data,
            },
            EventKind::Other => return None,
        };

        Some(Self {
            reply_token: event.reply_token?,
            source: event.source?,
            payload,
        })
    }
}

//! Error types for the leaf-doctor bot

use thiserror::Error;

/// Result type alias for leaf-doctor operations
pub type Result<T> = std::result::Result<T, Error>;

/// One field-level detail attached to a LINE API error response
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct LineErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub property: String,
}

/// Errors that can occur in the leaf-doctor bot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Webhook signature missing or not matching the body
    #[error("invalid signature: {0}")]
    Signature(String),

    /// Webhook body is not a valid event envelope
    #[error("invalid webhook payload: {0}")]
    Payload(String),

    /// LINE Messaging API rejected a request
    #[error("LINE API error ({status}): {message}")]
    LineApi {
        status: u16,
        message: String,
        details: Vec<LineErrorDetail>,
    },

    /// Media download or temp file handling error
    #[error("media error: {0}")]
    Media(String),

    /// Model loading or inference error
    #[error("vision error: {0}")]
    Vision(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image decode/encode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

//! LINE Messaging API client
//!
//! Replies to webhook events, looks up user profiles and downloads message
//! content. Webhook parsing lives in [`types`], signing in [`signature`].

pub mod signature;
pub mod types;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;

use self::types::{ErrorBody, Profile, ReplyRequest, SendMessage};
use super::{ContentStream, MessagingApi};
use crate::{Error, Result};

/// Messaging API base URL
pub const API_BASE: &str = "https://api.line.me";

/// Content API base URL (message attachments)
pub const DATA_API_BASE: &str = "https://api-data.line.me";

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineClient {
    channel_access_token: String,
    api_base: String,
    data_api_base: String,
    client: Client,
}

impl LineClient {
    /// Create a new client for the production endpoints
    #[must_use]
    pub fn new(channel_access_token: String) -> Self {
        Self::with_base_urls(
            channel_access_token,
            API_BASE.to_string(),
            DATA_API_BASE.to_string(),
        )
    }

    /// Create a client against custom endpoints
    #[must_use]
    pub fn with_base_urls(
        channel_access_token: String,
        api_base: String,
        data_api_base: String,
    ) -> Self {
        Self {
            channel_access_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            data_api_base: data_api_base.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.channel_access_token)
    }
}

/// Turn a non-success response into `Error::LineApi`
async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_else(|_| ErrorBody {
        message: body.clone(),
        details: Vec::new(),
    });

    Error::LineApi {
        status: status.as_u16(),
        message: parsed.message,
        details: parsed.details,
    }
}

#[async_trait]
impl MessagingApi for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let request = ReplyRequest {
            reply_token,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        tracing::debug!(count = messages.len(), "LINE reply sent");
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> Result<Profile> {
        let url = format!("{}/v2/bot/profile/{user_id}", self.api_base);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    async fn message_content(&self, message_id: &str) -> Result<ContentStream> {
        let url = format!("{}/v2/bot/message/{message_id}/content", self.data_api_base);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.bytes_stream().map_err(Error::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slashes() {
        let client = LineClient::with_base_urls(
            "token".to_string(),
            "http://localhost:1234/".to_string(),
            "http://localhost:5678//".to_string(),
        );
        assert_eq!(client.api_base, "http://localhost:1234");
        assert_eq!(client.data_api_base, "http://localhost:5678");
        assert_eq!(client.bearer(), "Bearer token");
    }
}

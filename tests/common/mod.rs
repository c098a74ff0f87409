//! Shared test utilities

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use image::{DynamicImage, ImageFormat, RgbImage};
use leaf_doctor::api::ApiState;
use leaf_doctor::error::LineErrorDetail;
use leaf_doctor::channels::line::signature;
use leaf_doctor::channels::{ContentStream, MessagingApi, Profile, SendMessage};
use leaf_doctor::vision::{BoundingBox, Detection, Detector};
use leaf_doctor::{Annotator, Bot, Error, MediaStore, Result};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::Mutex;

pub const CHANNEL_SECRET: &str = "test-channel-secret";
pub const HOST: &str = "bot.test";

/// One reply sent through the mock
#[derive(Debug, Clone)]
pub struct SentReply {
    pub reply_token: String,
    pub messages: Vec<SendMessage>,
}

/// Messaging API double that records replies
#[derive(Default)]
pub struct MockMessagingApi {
    pub replies: Mutex<Vec<SentReply>>,
    pub display_name: String,
    /// Bytes served for every message content request; `None` fails the download
    pub content: Option<Vec<u8>>,
    /// Status returned by `reply` and `profile` instead of succeeding
    pub api_error: Option<u16>,
}

impl MockMessagingApi {
    #[must_use]
    pub fn new(display_name: &str) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            display_name: display_name.to_string(),
            content: Some(png_bytes(64, 48)),
            api_error: None,
        }
    }

    /// Make `reply` and `profile` fail with a Messaging API error
    ///
    /// Replies are still recorded, so tests can see what was attempted.
    #[must_use]
    pub const fn with_api_error(mut self, status: u16) -> Self {
        self.api_error = Some(status);
        self
    }

    fn api_error(&self) -> Result<()> {
        match self.api_error {
            Some(status) => Err(Error::LineApi {
                status,
                message: "The request body has 1 error(s)".to_string(),
                details: vec![LineErrorDetail {
                    message: "May not be empty".to_string(),
                    property: "messages[0].text".to_string(),
                }],
            }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: Option<Vec<u8>>) -> Self {
        self.content = content;
        self
    }

    pub async fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().await.clone()
    }
}

#[async_trait]
impl MessagingApi for MockMessagingApi {
    async fn reply(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()> {
        self.replies.lock().await.push(SentReply {
            reply_token: reply_token.to_string(),
            messages: messages.to_vec(),
        });
        self.api_error()
    }

    async fn profile(&self, user_id: &str) -> Result<Profile> {
        self.api_error()?;
        Ok(Profile {
            display_name: self.display_name.clone(),
            user_id: user_id.to_string(),
            picture_url: None,
            status_message: None,
        })
    }

    async fn message_content(&self, message_id: &str) -> Result<ContentStream> {
        let Some(content) = self.content.clone() else {
            return Err(Error::LineApi {
                status: 404,
                message: format!("content of {message_id} not found"),
                details: Vec::new(),
            });
        };
        // Two chunks, as a real download would arrive
        let mid = content.len() / 2;
        let content = Bytes::from(content);
        let chunks = vec![Ok(content.slice(..mid)), Ok(content.slice(mid..))];
        Ok(futures::stream::iter(chunks).boxed())
    }
}

/// Detector double returning a fixed table
pub struct StubDetector {
    pub detections: Vec<Detection>,
}

impl StubDetector {
    #[must_use]
    pub fn returning(classes: &[(&str, f32)]) -> Self {
        let detections = classes
            .iter()
            .enumerate()
            .map(|(i, (name, confidence))| detection(i, name, *confidence))
            .collect();
        Self { detections }
    }
}

impl Detector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

#[must_use]
pub fn detection(class_id: usize, class_name: &str, confidence: f32) -> Detection {
    Detection {
        class_id,
        class_name: class_name.to_string(),
        confidence,
        bbox: BoundingBox {
            xmin: 4.0,
            ymin: 4.0,
            xmax: 40.0,
            ymax: 30.0,
        },
    }
}

/// Encode a solid green PNG
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([40, 160, 60]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, ImageFormat::Png)
        .expect("failed to encode test image");
    out.into_inner()
}

/// Router wired to the given doubles, serving a fresh static directory
pub struct TestApp {
    pub router: axum::Router,
    pub api: Arc<MockMessagingApi>,
    pub static_dir: TempDir,
}

#[must_use]
pub fn build_test_app(api: MockMessagingApi, detector: StubDetector) -> TestApp {
    let static_dir = tempfile::tempdir().expect("failed to create static dir");
    let store = MediaStore::new(static_dir.path());
    store.ensure_tmp_dir().expect("failed to create tmp dir");

    let api = Arc::new(api);
    let bot = Bot::new(
        api.clone(),
        Arc::new(detector),
        Arc::new(Annotator::new(None)),
        store,
    );

    let state = Arc::new(ApiState {
        channel_secret: CHANNEL_SECRET.to_string(),
        bot: Arc::new(bot),
        public_base_url: None,
    });

    TestApp {
        router: leaf_doctor::api::router(state, static_dir.path()),
        api,
        static_dir,
    }
}

/// Signature the platform would send for `body`
#[must_use]
pub fn sign(body: &str) -> String {
    signature::sign(CHANNEL_SECRET, body.as_bytes()).expect("failed to sign body")
}

/// Webhook body holding the given events
#[must_use]
pub fn envelope(events: Vec<Value>) -> String {
    json!({ "destination": "Ubot", "events": events }).to_string()
}

#[must_use]
pub fn user_source() -> Value {
    json!({ "type": "user", "userId": "U1234" })
}

#[must_use]
pub fn message_event(reply_token: &str, source: Value, message: Value) -> Value {
    json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1_700_000_000_000_i64,
        "replyToken": reply_token,
        "source": source,
        "message": message,
    })
}

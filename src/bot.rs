//! Event handling
//!
//! One [`Bot`] is built at startup with its dependencies injected and shared
//! by all webhook requests. Each event is dispatched by an explicit match on
//! its payload.

use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};

use crate::advisory;
use crate::channels::{EventSource, MessagingApi, SendMessage};
use crate::events::{EventPayload, InboundEvent};
use crate::media::{self, IMAGE_EXT, MediaStore};
use crate::vision::{Annotator, Detection, Detector};
use crate::{Error, Result};

/// Text command that replies with the sender's display name
pub const PROFILE_COMMAND: &str = "profile";

/// Reply when the profile command comes from a group or room
pub const NO_USER_ID_TEXT: &str = "Bot can't use profile API without user ID";

/// Title used when echoing a location back
pub const LOCATION_TITLE: &str = "Location";

/// Outcome of running the detector on one upload
#[derive(Debug, Clone)]
pub struct ImageDiagnosis {
    /// Detections in result-table order
    pub detections: Vec<Detection>,
    /// Annotated copy on disk
    pub annotated_path: PathBuf,
    /// Public URL of the annotated copy
    pub image_url: String,
}

/// Webhook event handler
pub struct Bot {
    api: Arc<dyn MessagingApi>,
    detector: Arc<dyn Detector>,
    annotator: Arc<Annotator>,
    media: MediaStore,
}

impl Bot {
    #[must_use]
    pub fn new(
        api: Arc<dyn MessagingApi>,
        detector: Arc<dyn Detector>,
        annotator: Arc<Annotator>,
        media: MediaStore,
    ) -> Self {
        Self {
            api,
            detector,
            annotator,
            media,
        }
    }

    /// Handle events in order, logging failures instead of returning them
    ///
    /// `root_url` is the public root the annotated images are linked from.
    pub async fn dispatch(&self, events: Vec<InboundEvent>, root_url: &str) {
        for event in events {
            let kind = event.payload.kind();
            if let Err(e) = self.handle_event(event, root_url).await {
                log_handler_error(kind, &e);
            }
        }
    }

    /// Handle a single event
    ///
    /// # Errors
    ///
    /// Returns error if a Messaging API call fails
    pub async fn handle_event(&self, event: InboundEvent, root_url: &str) -> Result<()> {
        let InboundEvent {
            reply_token,
            source,
            payload,
        } = event;

        match payload {
            EventPayload::Text { text } => self.handle_text(&reply_token, &source, &text).await,
            EventPayload::Image { message_id } => {
                self.handle_image(&reply_token, &message_id, root_url).await
            }
            EventPayload::Location {
                address,
                latitude,
                longitude,
                ..
            } => {
                let reply = SendMessage::Location {
                    title: LOCATION_TITLE.to_string(),
                    address: address.unwrap_or_default(),
                    latitude,
                    longitude,
                };
                self.api.reply(&reply_token, &[reply]).await
            }
            EventPayload::Sticker {
                package_id,
                sticker_id,
            } => {
                let reply = SendMessage::Sticker {
                    package_id,
                    sticker_id,
                };
                self.api.reply(&reply_token, &[reply]).await
            }
            EventPayload::Postback { data } => {
                tracing::debug!(data = %data, "ignoring postback");
                Ok(())
            }
        }
    }

    async fn handle_text(&self, reply_token: &str, source: &EventSource, text: &str) -> Result<()> {
        if text != PROFILE_COMMAND {
            return Ok(());
        }

        let reply = match source.direct_user_id() {
            Some(user_id) => {
                let profile = self.api.profile(user_id).await?;
                format!("Display name: {}", profile.display_name)
            }
            None => NO_USER_ID_TEXT.to_string(),
        };

        self.api
            .reply(reply_token, &[SendMessage::text(reply)])
            .await
    }

    /// Diagnose an image message and send exactly one reply
    ///
    /// Download, decode or inference failures get the generic reply.
    async fn handle_image(&self, reply_token: &str, message_id: &str, root_url: &str) -> Result<()> {
        let messages = match self.diagnose_message(message_id, root_url).await {
            Ok(diagnosis) => {
                let advisory = advisory::diagnose(&diagnosis.detections);
                tracing::info!(
                    message_id,
                    detections = diagnosis.detections.len(),
                    class = ?diagnosis.detections.last().map(|d| d.class_name.as_str()),
                    advisory = ?advisory.map(|a| a.class_name),
                    url = %diagnosis.image_url,
                    "diagnosed image"
                );
                advisory::compose_reply(advisory, &diagnosis.image_url)
            }
            Err(e) => {
                log_handler_error("image", &e);
                advisory::compose_reply(None, "")
            }
        };

        self.api.reply(reply_token, &messages).await
    }

    /// Fetch, store, detect and annotate one image message
    ///
    /// # Errors
    ///
    /// Returns error if any step of the pipeline fails
    pub async fn diagnose_message(&self, message_id: &str, root_url: &str) -> Result<ImageDiagnosis> {
        let content = self.api.message_content(message_id).await?;
        let upload = self.media.save_content(IMAGE_EXT, content).await?;
        let annotated_path = self.media.result_path(&upload);

        let bytes = tokio::fs::read(&upload.path).await?;
        let detector = Arc::clone(&self.detector);
        let annotator = Arc::clone(&self.annotator);
        let target = annotated_path.clone();

        let detections = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&bytes)?;
            detect_and_annotate(detector.as_ref(), &annotator, &image, &target)
        })
        .await
        .map_err(|e| Error::Vision(format!("inference task failed: {e}")))??;

        let image_url = media::absolute_url(root_url, &self.media.public_path(&annotated_path)?)?;

        Ok(ImageDiagnosis {
            detections,
            annotated_path,
            image_url,
        })
    }
}

/// Run the detector, then write the annotated copy as JPEG to `target`
///
/// # Errors
///
/// Returns error if inference or writing the image fails
pub fn detect_and_annotate(
    detector: &dyn Detector,
    annotator: &Annotator,
    image: &DynamicImage,
    target: &std::path::Path,
) -> Result<Vec<Detection>> {
    let detections = detector.detect(image)?;
    for d in &detections {
        tracing::debug!(
            class = %d.class_name,
            confidence = d.confidence,
            xmin = d.bbox.xmin,
            ymin = d.bbox.ymin,
            xmax = d.bbox.xmax,
            ymax = d.bbox.ymax,
            "detection"
        );
    }

    annotator
        .annotate(image, &detections)
        .save_with_format(target, ImageFormat::Jpeg)?;
    Ok(detections)
}

/// Log a handler failure, with per-field detail for Messaging API errors
pub fn log_handler_error(kind: &str, error: &Error) {
    match error {
        Error::LineApi {
            status,
            message,
            details,
        } => {
            tracing::error!(event = kind, status, reason = %message, "got error from LINE Messaging API");
            for detail in details {
                tracing::error!(property = %detail.property, reason = %detail.message, "LINE API error detail");
            }
        }
        other => tracing::error!(event = kind, error = %other, "failed to handle event"),
    }
}

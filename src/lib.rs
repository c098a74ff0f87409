//! Leaf Doctor - LINE bot that diagnoses leaf diseases from photos
//!
//! Users send a leaf photo to the bot's LINE account. The webhook downloads
//! it, runs a YOLO detector over it, draws the detections onto a copy served
//! from `/static`, and replies with the annotated image plus care advice for
//! the detected disease.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          LINE platform (webhooks)            │
//! └──────────────────────┬───────────────────────┘
//!                        │ POST /callback
//! ┌──────────────────────▼───────────────────────┐
//! │   api  →  events  →  bot                     │
//! │                      │   │   │               │
//! │          channels ◄──┘   │   └──► advisory   │
//! │          (Messaging API) │                   │
//! │                  media ◄─┴─► vision          │
//! └──────────────────────────────────────────────┘
//! ```

pub mod advisory;
pub mod api;
pub mod bot;
pub mod channels;
pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod media;
pub mod vision;

pub use bot::Bot;
pub use channels::{LineClient, MessagingApi};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use events::{EventPayload, InboundEvent};
pub use media::MediaStore;
pub use vision::{Annotator, Detection, Detector};

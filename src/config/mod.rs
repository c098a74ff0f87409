//! Configuration management for leaf-doctor

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use self::file::{ConfigFile, VisionFileConfig};
use crate::{Error, Result};

/// Message shown when the LINE credentials are missing
pub const MISSING_SECRETS_MESSAGE: &str =
    "Specify LINE_CHANNEL_SECRET and LINE_CHANNEL_ACCESS_TOKEN as environment variables.";

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// LINE channel credentials
    pub line: LineConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Static directory and temp file retention
    pub media: MediaConfig,

    /// Detection model configuration
    pub vision: VisionConfig,
}

/// LINE channel credentials
#[derive(Clone)]
pub struct LineConfig {
    /// Channel secret, used to verify webhook signatures
    pub channel_secret: String,
    /// Long-lived channel access token for the Messaging API
    pub channel_access_token: String,
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_secret", &"<redacted>")
            .field("channel_access_token", &"<redacted>")
            .finish()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root URL the platform can reach us at; derived per request when unset
    pub public_base_url: Option<String>,
}

/// Static directory and retention configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Age after which temp files are deleted
    pub retention: Duration,
    /// How often the sweeper runs; zero disables it
    pub sweep_interval: Duration,
}

impl MediaConfig {
    /// Directory holding uploads and annotated images
    #[must_use]
    pub fn tmp_dir(&self) -> PathBuf {
        self.static_dir.join("tmp")
    }
}

/// Detection model configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// ONNX checkpoint
    pub model_path: PathBuf,
    /// Optional class names file, one name per line
    pub labels_path: Option<PathBuf>,
    /// TrueType font used for box labels
    pub font_path: Option<PathBuf>,
}

impl VisionConfig {
    /// Load only the model settings; LINE credentials are not required
    ///
    /// # Errors
    ///
    /// Returns error if the explicit config file cannot be read
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let fc = file::load_config_file(config_path)?;
        Ok(Self::from_sources(&|key: &str| std::env::var(key).ok(), fc.vision))
    }

    fn from_sources(env: &impl Fn(&str) -> Option<String>, fc: VisionFileConfig) -> Self {
        Self {
            model_path: env("MODEL_PATH")
                .or(fc.model_path)
                .map_or_else(|| PathBuf::from("yolov5s.onnx"), PathBuf::from),
            labels_path: env("MODEL_LABELS_PATH")
                .or(fc.labels_path)
                .map(PathBuf::from),
            font_path: env("LABEL_FONT_PATH")
                .or(fc.font_path)
                .map(PathBuf::from),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, `.env` and the
    /// TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if the LINE credentials are missing or the explicit
    /// config file cannot be read
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        // Load .env if present; real env vars win over it
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }

        let fc = file::load_config_file(config_path)?;
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an env lookup and a parsed config file
    /// (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if the LINE credentials are missing
    pub fn from_sources(env: impl Fn(&str) -> Option<String>, fc: ConfigFile) -> Result<Self> {
        let channel_secret = env("LINE_CHANNEL_SECRET").or(fc.line.channel_secret);
        let channel_access_token = env("LINE_CHANNEL_ACCESS_TOKEN").or(fc.line.channel_access_token);

        let (Some(channel_secret), Some(channel_access_token)) =
            (channel_secret, channel_access_token)
        else {
            return Err(Error::Config(MISSING_SECRETS_MESSAGE.to_string()));
        };

        let server = ServerConfig {
            host: env("HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env("PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8000),
            public_base_url: env("PUBLIC_BASE_URL")
                .or(fc.server.public_base_url)
                .filter(|s| !s.is_empty()),
        };

        let media = MediaConfig {
            static_dir: env("STATIC_DIR")
                .or(fc.media.static_dir)
                .map_or_else(|| PathBuf::from("static"), PathBuf::from),
            retention: Duration::from_secs(
                env("TMP_RETENTION_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.media.retention_secs)
                    .unwrap_or(86_400),
            ),
            sweep_interval: Duration::from_secs(
                env("TMP_SWEEP_INTERVAL_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.media.sweep_interval_secs)
                    .unwrap_or(3_600),
            ),
        };

        let vision = VisionConfig::from_sources(&env, fc.vision);

        Ok(Self {
            line: LineConfig {
                channel_secret,
                channel_access_token,
            },
            server,
            media,
            vision,
        })
    }
}

//! Main daemon orchestration

use std::sync::Arc;

use crate::api::{ApiServer, ApiState};
use crate::bot::Bot;
use crate::channels::LineClient;
use crate::media::{MediaStore, retention};
use crate::vision::{self, Annotator};
use crate::{Config, Result};

/// The bot daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the temp directory, the model or the listener
    /// cannot be set up
    pub async fn run(self) -> Result<()> {
        let Config {
            line,
            server,
            media,
            vision: vision_config,
        } = self.config;

        let store = MediaStore::new(&media.static_dir);
        store.ensure_tmp_dir()?;
        tracing::info!(path = %store.tmp_dir().display(), "temp directory ready");

        let detector = vision::load_detector(&vision_config)?;
        let annotator = Arc::new(Annotator::load(vision_config.font_path.as_deref()));

        let api = Arc::new(LineClient::new(line.channel_access_token));
        let bot = Arc::new(Bot::new(api, detector, annotator, store));

        let sweeper = retention::spawn_sweeper(media.tmp_dir(), media.retention, media.sweep_interval);

        let state = Arc::new(ApiState {
            channel_secret: line.channel_secret,
            bot,
            public_base_url: server.public_base_url,
        });

        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
        };

        let result = ApiServer::new(state, server.host, server.port, media.static_dir)
            .run(shutdown)
            .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }

        tracing::info!("daemon stopped");
        result
    }
}

//! HTTP server for the bot

pub mod health;
pub mod webhooks;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::bot::Bot;
use crate::media::STATIC_ROUTE;

/// Shared state for API handlers
pub struct ApiState {
    /// Secret the webhook signatures are checked against
    pub channel_secret: String,
    /// Event handler
    pub bot: Arc<Bot>,
    /// Fixed public root URL; derived from request headers when `None`
    pub public_base_url: Option<String>,
}

impl ApiState {
    /// Public root URL for links in replies
    ///
    /// Uses the configured base URL, else `X-Forwarded-Proto` /
    /// `X-Forwarded-Host` as set by a reverse proxy, else `Host` over http.
    #[must_use]
    pub fn root_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return base.clone();
        }

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                // Proxies may append: take the first hop
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let scheme = header("x-forwarded-proto").unwrap_or("http");
        let host = header("x-forwarded-host")
            .or_else(|| header("host"))
            .unwrap_or("localhost");
        format!("{scheme}://{host}/")
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>, static_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhooks::router(state))
        .nest_service(&format!("/{STATIC_ROUTE}"), ServeDir::new(static_dir.into()))
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
    static_dir: PathBuf,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: Arc<ApiState>, host: String, port: u16, static_dir: PathBuf) -> Self {
        Self {
            state,
            host,
            port,
            static_dir,
        }
    }

    /// Run the API server until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(addr = %addr, static_dir = %self.static_dir.display(), "API server listening");

        axum::serve(listener, router(self.state, self.static_dir))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn state(public_base_url: Option<&str>) -> ApiState {
        let bot = Bot::new(
            Arc::new(crate::channels::LineClient::new("token".to_string())),
            Arc::new(NoDetections),
            Arc::new(crate::vision::Annotator::new(None)),
            crate::media::MediaStore::new(std::path::Path::new("static")),
        );
        ApiState {
            channel_secret: "secret".to_string(),
            bot: Arc::new(bot),
            public_base_url: public_base_url.map(String::from),
        }
    }

    struct NoDetections;

    impl crate::vision::Detector for NoDetections {
        fn detect(
            &self,
            _image: &image::DynamicImage,
        ) -> crate::Result<Vec<crate::vision::Detection>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn configured_root_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:8000"));
        assert_eq!(
            state(Some("https://bot.example.com/")).root_url(&headers),
            "https://bot.example.com/"
        );
    }

    #[test]
    fn forwarded_headers_are_honoured() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:8000"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert(
            "x-forwarded-host",
            HeaderValue::from_static("bot.example.com, proxy.local"),
        );
        assert_eq!(state(None).root_url(&headers), "https://bot.example.com/");
    }

    #[test]
    fn falls_back_to_host() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost:8000"));
        assert_eq!(state(None).root_url(&headers), "http://localhost:8000/");
    }
}

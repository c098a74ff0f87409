//! TOML configuration file loading
//!
//! Supports `~/.config/leaf-doctor/config.toml` (or an explicit `--config`
//! path) as a persistent config source. All fields are optional; the file is a
//! partial overlay on top of defaults and is itself overridden by env vars.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// LINE channel credentials
    #[serde(default)]
    pub line: LineFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Static/temp file configuration
    #[serde(default)]
    pub media: MediaFileConfig,

    /// Detection model configuration
    #[serde(default)]
    pub vision: VisionFileConfig,
}

/// LINE channel credentials
#[derive(Debug, Default, Deserialize)]
pub struct LineFileConfig {
    pub channel_secret: Option<String>,
    pub channel_access_token: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Public root URL used when building image links
    pub public_base_url: Option<String>,
}

/// Static directory and retention configuration
#[derive(Debug, Default, Deserialize)]
pub struct MediaFileConfig {
    pub static_dir: Option<String>,
    pub retention_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

/// Detection model configuration
#[derive(Debug, Default, Deserialize)]
pub struct VisionFileConfig {
    pub model_path: Option<String>,
    pub labels_path: Option<String>,
    pub font_path: Option<String>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The default path is optional:
/// returns `ConfigFile::default()` if it doesn't exist or can't be parsed.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> crate::Result<ConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(ConfigFile::default());
    };

    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(ConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(ConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/leaf-doctor/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("leaf-doctor").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000

            [vision]
            model_path = "models/durian.onnx"
            "#,
        )
        .unwrap();

        assert_eq!(fc.server.port, Some(9000));
        assert_eq!(fc.vision.model_path.as_deref(), Some("models/durian.onnx"));
        assert!(fc.line.channel_secret.is_none());
        assert!(fc.media.static_dir.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config_file(Some(&missing)).is_err());
    }
}

//! Temp files for downloaded and annotated images
//!
//! Uploads land in `<static_dir>/tmp` under a random name so they can be
//! served back to the platform from `/static/tmp/...`.

pub mod retention;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::channels::ContentStream;
use crate::{Error, Result};

/// Extension given to image uploads
pub const IMAGE_EXT: &str = "jpg";

/// URL prefix the static directory is mounted at
pub const STATIC_ROUTE: &str = "static";

/// A downloaded upload, renamed to carry its extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempImage {
    /// Final path, `<tmp>/<stem>.<ext>`
    pub path: PathBuf,
    /// Random temp file name without extension
    pub stem: String,
    pub ext: String,
}

/// Owner of the public temp directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    tmp_dir: PathBuf,
}

impl MediaStore {
    /// Store rooted at `<static_dir>/tmp`
    #[must_use]
    pub fn new(static_dir: &Path) -> Self {
        Self {
            tmp_dir: static_dir.join("tmp"),
        }
    }

    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Create the temp directory
    ///
    /// An existing directory is fine; anything else at that path is an error.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn ensure_tmp_dir(&self) -> Result<()> {
        match std::fs::create_dir_all(&self.tmp_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && self.tmp_dir.is_dir() => {
                Ok(())
            }
            Err(e) => Err(Error::Media(format!(
                "failed to create {}: {e}",
                self.tmp_dir.display()
            ))),
        }
    }

    /// Stream content into a new uniquely named temp file, then rename it to
    /// `<name>.<ext>`
    ///
    /// The partial file is removed if the download fails.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or the stream fails
    pub async fn save_content(&self, ext: &str, mut content: ContentStream) -> Result<TempImage> {
        let temp = tempfile::Builder::new()
            .prefix(&format!("{ext}-"))
            .tempfile_in(&self.tmp_dir)
            .map_err(|e| Error::Media(format!("failed to create temp file: {e}")))?;
        let (file, temp_path) = temp
            .keep()
            .map_err(|e| Error::Media(format!("failed to keep temp file: {e}")))?;

        let written = async {
            let mut file = tokio::fs::File::from_std(file);
            let mut total = 0_usize;
            while let Some(chunk) = content.next().await {
                let chunk = chunk?;
                total += chunk.len();
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<_, Error>(total)
        }
        .await;

        let total = match written {
            Ok(total) => total,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&temp_path).await {
                    tracing::warn!(path = %temp_path.display(), error = %rm, "failed to remove partial download");
                }
                return Err(e);
            }
        };

        let stem = temp_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Media("temp file has no name".to_string()))?;

        let mut dist: OsString = temp_path.clone().into_os_string();
        dist.push(format!(".{ext}"));
        let path = PathBuf::from(dist);
        tokio::fs::rename(&temp_path, &path).await?;

        tracing::debug!(path = %path.display(), bytes = total, "saved message content");
        Ok(TempImage {
            path,
            stem,
            ext: ext.to_string(),
        })
    }

    /// Where the annotated copy of an upload goes
    #[must_use]
    pub fn result_path(&self, upload: &TempImage) -> PathBuf {
        self.tmp_dir
            .join(format!("{}_result.{}", upload.stem, upload.ext))
    }

    /// URL path, relative to the site root, of a file in the temp directory
    ///
    /// # Errors
    ///
    /// Returns error if the path has no file name
    pub fn public_path(&self, file: &Path) -> Result<String> {
        let name = file
            .file_name()
            .ok_or_else(|| Error::Media(format!("no file name in {}", file.display())))?;
        Ok(format!("{STATIC_ROUTE}/tmp/{}", name.to_string_lossy()))
    }
}

/// Join a root URL with a site-relative path
///
/// # Errors
///
/// Returns error if `root` is not an absolute URL
pub fn absolute_url(root: &str, relative: &str) -> Result<String> {
    let mut base =
        Url::parse(root).map_err(|e| Error::Media(format!("invalid root url {root:?}: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(relative.trim_start_matches('/'))
        .map(String::from)
        .map_err(|e| Error::Media(format!("invalid path {relative:?}: {e}")))
}

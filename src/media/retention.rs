//! Time-based cleanup of the public temp directory

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;

use crate::Result;

/// Delete regular files in `dir` last modified more than `max_age` before `now`
///
/// Returns the number of files removed. Files that vanish or fail to delete
/// mid-sweep are logged and skipped.
///
/// # Errors
///
/// Returns error if the directory cannot be listed
pub fn sweep(dir: &Path, max_age: Duration, now: SystemTime) -> Result<usize> {
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let expired = now
            .duration_since(modified)
            .is_ok_and(|age| age > max_age);
        if !expired {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to remove expired temp file");
            }
        }
    }

    Ok(removed)
}

/// Run [`sweep`] periodically in the background
///
/// Returns `None` when `interval` is zero (sweeping disabled).
#[must_use]
pub fn spawn_sweeper(dir: PathBuf, max_age: Duration, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("temp file sweeper disabled");
        return None;
    }

    tracing::info!(
        dir = %dir.display(),
        max_age_secs = max_age.as_secs(),
        interval_secs = interval.as_secs(),
        "starting temp file sweeper"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let dir = dir.clone();
            let outcome =
                tokio::task::spawn_blocking(move || sweep(&dir, max_age, SystemTime::now())).await;

            match outcome {
                Ok(Ok(0)) => {}
                Ok(Ok(removed)) => tracing::info!(removed, "removed expired temp files"),
                Ok(Err(e)) => tracing::warn!(error = %e, "temp file sweep failed"),
                Err(e) => tracing::error!(error = %e, "temp file sweep panicked"),
            }
        }
    }))
}

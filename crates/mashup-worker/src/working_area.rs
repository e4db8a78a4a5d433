//! Per-run scratch directory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use mashup_media::remove_dir_if_exists;
use mashup_models::RunId;

/// Directory holding downloads and clips for exactly one run.
///
/// Removed by [`WorkingArea::cleanup`]; if the run is dropped before that
/// (panic, interrupted future) the drop guard removes it synchronously.
#[derive(Debug)]
pub struct WorkingArea {
    path: PathBuf,
    removed: bool,
}

impl WorkingArea {
    /// Directory name for a run under `root`.
    pub fn path_for(root: &Path, run_id: &RunId) -> PathBuf {
        root.join(format!("mashup-{}", run_id))
    }

    /// Create (if absent) the working area for `run_id` under `root`.
    pub async fn create(root: &Path, run_id: &RunId) -> std::io::Result<Self> {
        let path = Self::path_for(root, run_id);
        tokio::fs::create_dir_all(&path).await?;
        // Absolute, so concat lists resolve regardless of their own location
        let path = tokio::fs::canonicalize(&path).await?;
        debug!(path = %path.display(), "Created working area");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where trimmed segments are written.
    pub fn clips_dir(&self) -> PathBuf {
        self.path.join("clips")
    }

    /// Where the artifact is encoded before being moved into place.
    pub fn scratch_dir(&self) -> PathBuf {
        self.path.join("out")
    }

    /// Remove the directory tree. Safe to call repeatedly; a directory that is
    /// already gone counts as success.
    pub async fn cleanup(&mut self) -> std::io::Result<()> {
        if self.removed {
            return Ok(());
        }
        let existed = remove_dir_if_exists(&self.path).await?;
        self.removed = true;
        debug!(path = %self.path.display(), existed, "Removed working area");
        Ok(())
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed working area on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove working area on drop"
            ),
        }
    }
}

//! Trimming stage: bound every acquired item to the target duration.
//!
//! Each item is handled independently; a failure to open or cut one item turns
//! into [`TrimOutcome::Skipped`] and never aborts the stage.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use mashup_media::AudioToolkit;
use mashup_models::{AudioItem, Clip, TrimOutcome};

/// Removes a segment file unless the cut that produced it succeeded.
struct PendingSegment {
    path: PathBuf,
    keep: bool,
}

impl PendingSegment {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PendingSegment {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Cuts items with an [`AudioToolkit`], writing segments to `clips_dir`.
pub struct ClipTrimmer<'a, T> {
    toolkit: &'a T,
    clips_dir: PathBuf,
    target_secs: f64,
    max_parallel: usize,
}

impl<'a, T: AudioToolkit> ClipTrimmer<'a, T> {
    pub fn new(toolkit: &'a T, clips_dir: impl Into<PathBuf>, target_secs: f64) -> Self {
        Self {
            toolkit,
            clips_dir: clips_dir.into(),
            target_secs,
            max_parallel: 1,
        }
    }

    /// Trim up to `n` items at once. Output order is unaffected.
    pub fn with_max_parallel(mut self, n: usize) -> Self {
        self.max_parallel = n.max(1);
        self
    }

    /// Trim every item, returning one outcome per item in input order.
    pub async fn trim_all(&self, items: &[AudioItem]) -> Vec<TrimOutcome> {
        stream::iter(items)
            .map(|item| self.trim(item))
            .buffered(self.max_parallel)
            .collect()
            .await
    }

    /// Trim one item to at most the target duration.
    pub async fn trim(&self, item: &AudioItem) -> TrimOutcome {
        let duration = match self.toolkit.probe_duration(item.path()).await {
            Ok(d) if d.is_finite() && d > 0.0 => d,
            Ok(d) => return self.skip(item, format!("unusable duration {}", d)),
            Err(e) => return self.skip(item, e.to_string()),
        };

        if duration <= self.target_secs {
            debug!(
                source_id = %item.source_id,
                duration_secs = duration,
                "Item shorter than target, using whole file"
            );
            return TrimOutcome::Trimmed(Clip::passthrough(item, duration));
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.clips_dir).await {
            return self.skip(item, format!("cannot create clips directory: {}", e));
        }

        let pending = PendingSegment::new(self.segment_path(item));
        match self
            .toolkit
            .extract_head(item.path(), &pending.path, self.target_secs)
            .await
        {
            Ok(()) => {
                let path = pending.keep();
                debug!(
                    source_id = %item.source_id,
                    from_secs = duration,
                    to_secs = self.target_secs,
                    "Trimmed item"
                );
                TrimOutcome::Trimmed(Clip::segment(item, path, self.target_secs))
            }
            Err(e) => self.skip(item, e.to_string()),
        }
    }

    /// Segment path for an item; stable so repeated trims overwrite.
    fn segment_path(&self, item: &AudioItem) -> PathBuf {
        let name = item
            .path()
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| format!("{}.audio", item.source_id).into());
        self.clips_dir.join(name)
    }

    fn skip(&self, item: &AudioItem, reason: String) -> TrimOutcome {
        warn!(
            source_id = %item.source_id,
            path = %item.path().display(),
            reason = %reason,
            "Skipping item"
        );
        metrics::counter!("mashup_items_skipped_total").increment(1);
        TrimOutcome::skipped(item, reason)
    }

    pub fn clips_dir(&self) -> &Path {
        &self.clips_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mashup_media::{AudioEncoding, MediaError, MediaResult};
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Durations keyed by file name; missing names fail to open. Extraction of
    /// names in `fail_cut` writes a partial file, then fails.
    #[derive(Default)]
    struct FakeToolkit {
        durations: HashMap<String, f64>,
        fail_cut: Vec<String>,
        delays_ms: HashMap<String, u64>,
    }

    fn name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().to_string()
    }

    #[async_trait]
    impl AudioToolkit for FakeToolkit {
        async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
            if let Some(ms) = self.delays_ms.get(&name(path)) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.durations
                .get(&name(path))
                .copied()
                .ok_or_else(|| MediaError::invalid_audio("No audio stream found"))
        }

        async fn extract_head(&self, _input: &Path, output: &Path, _duration: f64) -> MediaResult<()> {
            tokio::fs::write(output, b"segment").await?;
            if self.fail_cut.contains(&name(output)) {
                return Err(MediaError::ffmpeg_failed("cut failed", None, Some(1)));
            }
            Ok(())
        }

        async fn concat(&self, _: &[PathBuf], _: &Path, _: &Path, _: &AudioEncoding, _: f64) -> MediaResult<()> {
            unreachable!("trimmer never concatenates")
        }
    }

    fn item(dir: &Path, name: &str) -> AudioItem {
        AudioItem::new(name.trim_end_matches(".mp3"), dir.join(name))
    }

    #[tokio::test]
    async fn test_long_item_is_cut_to_target() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit {
            durations: HashMap::from([("001-a.mp3".to_string(), 185.0)]),
            ..Default::default()
        };
        let trimmer = ClipTrimmer::new(&toolkit, dir.path().join("clips"), 20.0);

        match trimmer.trim(&item(dir.path(), "001-a.mp3")).await {
            TrimOutcome::Trimmed(clip) => {
                assert!(clip.derived);
                assert_eq!(clip.duration_secs, 20.0);
                assert!(clip.path.starts_with(dir.path().join("clips")));
                assert!(clip.path.exists());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_short_item_passes_through() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit {
            durations: HashMap::from([("001-a.mp3".to_string(), 20.0)]),
            ..Default::default()
        };
        let trimmer = ClipTrimmer::new(&toolkit, dir.path().join("clips"), 20.0);
        let source = item(dir.path(), "001-a.mp3");

        match trimmer.trim(&source).await {
            TrimOutcome::Trimmed(clip) => {
                assert!(!clip.derived);
                assert_eq!(clip.path, source.path);
                assert_eq!(clip.duration_secs, 20.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!dir.path().join("clips").exists());
    }

    #[tokio::test]
    async fn test_undecodable_and_zero_length_items_are_skipped() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit {
            durations: HashMap::from([("002-zero.mp3".to_string(), 0.0)]),
            ..Default::default()
        };
        let trimmer = ClipTrimmer::new(&toolkit, dir.path().join("clips"), 20.0);

        let corrupt = trimmer.trim(&item(dir.path(), "001-corrupt.mp3")).await;
        let zero = trimmer.trim(&item(dir.path(), "002-zero.mp3")).await;

        match corrupt {
            TrimOutcome::Skipped(s) => assert!(s.reason.contains("No audio stream")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!zero.is_trimmed());
    }

    #[tokio::test]
    async fn test_failed_cut_leaves_no_partial_segment() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit {
            durations: HashMap::from([("001-a.mp3".to_string(), 60.0)]),
            fail_cut: vec!["001-a.mp3".to_string()],
            ..Default::default()
        };
        let trimmer = ClipTrimmer::new(&toolkit, dir.path().join("clips"), 20.0);

        let outcome = trimmer.trim(&item(dir.path(), "001-a.mp3")).await;
        assert!(!outcome.is_trimmed());
        assert!(!dir.path().join("clips").join("001-a.mp3").exists());
    }

    #[tokio::test]
    async fn test_trimming_twice_yields_same_duration() {
        let dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit {
            durations: HashMap::from([("001-a.mp3".to_string(), 95.5)]),
            ..Default::default()
        };
        let trimmer = ClipTrimmer::new(&toolkit, dir.path().join("clips"), 30.0);
        let source = item(dir.path(), "001-a.mp3");

        let first = trimmer.trim(&source).await;
        let second = trimmer.trim(&source).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_parallel_trim_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        let names = ["001-a.mp3", "002-b.mp3", "003-c.mp3", "004-d.mp3"];
        let toolkit = FakeToolkit {
            durations: names.iter().map(|n| (n.to_string(), 45.0)).collect(),
            // earlier items finish last
            delays_ms: HashMap::from([
                ("001-a.mp3".to_string(), 40),
                ("002-b.mp3".to_string(), 20),
            ]),
            ..Default::default()
        };
        let trimmer =
            ClipTrimmer::new(&toolkit, dir.path().join("clips"), 20.0).with_max_parallel(4);
        let items: Vec<_> = names.iter().map(|n| item(dir.path(), n)).collect();

        let outcomes = trimmer.trim_all(&items).await;
        let ids: Vec<_> = outcomes
            .iter()
            .map(|o| match o {
                TrimOutcome::Trimmed(c) => c.source_id.clone(),
                TrimOutcome::Skipped(s) => s.source_id.clone(),
            })
            .collect();
        assert_eq!(ids, vec!["001-a", "002-b", "003-c", "004-d"]);
    }
}

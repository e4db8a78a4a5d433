//! Provider seams the pipeline depends on.
//!
//! The pipeline only needs two narrow contracts: "give me up to N audio files
//! for this query" and "probe / cut / join audio files". The defaults are
//! [`crate::YtDlpSource`] and [`FfmpegToolkit`]; tests substitute fakes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use mashup_models::{AudioFormat, AudioItem, Query};

use crate::clip::extract_head;
use crate::command::FfmpegRunner;
use crate::concat::{concat_audio, AudioEncoding};
use crate::error::MediaResult;
use crate::probe::probe_audio;

/// Search/download provider.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Materialize up to `query.count()` audio files of `format` under `dest`.
    ///
    /// Returns the items in enumeration order. Per-item failures are not
    /// errors; `Err` means the whole request failed.
    async fn fetch(&self, query: &Query, dest: &Path, format: AudioFormat) -> MediaResult<Vec<AudioItem>>;
}

/// Audio decode/encode provider.
#[async_trait]
pub trait AudioToolkit: Send + Sync {
    /// Open `path` and report its duration in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;

    /// Write the first `duration` seconds of `input` to `output`.
    async fn extract_head(&self, input: &Path, output: &Path, duration: f64) -> MediaResult<()>;

    /// Join `inputs` in order into `output`. `scratch_dir` may hold
    /// intermediate files for the duration of the call.
    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        scratch_dir: &Path,
        encoding: &AudioEncoding,
        expected_secs: f64,
    ) -> MediaResult<()>;
}

/// FFmpeg/FFprobe backed [`AudioToolkit`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolkit {
    runner: FfmpegRunner,
}

impl FfmpegToolkit {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AudioToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        Ok(probe_audio(path).await?.duration)
    }

    async fn extract_head(&self, input: &Path, output: &Path, duration: f64) -> MediaResult<()> {
        extract_head(&self.runner, input, output, duration).await
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        scratch_dir: &Path,
        encoding: &AudioEncoding,
        expected_secs: f64,
    ) -> MediaResult<()> {
        let list_path = scratch_dir.join("concat.txt");
        concat_audio(&self.runner, inputs, &list_path, output, encoding, expected_secs).await
    }
}

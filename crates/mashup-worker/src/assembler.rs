//! Assembly stage: join clips, in order, into the final artifact.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use mashup_media::{move_file, AudioEncoding, AudioToolkit};
use mashup_models::{AudioFormat, Clip, MashupArtifact, SkippedItem};

use crate::error::{PipelineError, PipelineResult};

/// Surviving clips of a run plus the items that were skipped.
///
/// Segment files the trimmer cut are removed when the set is dropped;
/// pass-through clips point at downloads and are left alone.
#[derive(Debug, Default)]
pub struct ClipSet {
    clips: Vec<Clip>,
    skipped: Vec<SkippedItem>,
}

impl ClipSet {
    pub fn new(clips: Vec<Clip>, skipped: Vec<SkippedItem>) -> Self {
        Self { clips, skipped }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn skipped(&self) -> &[SkippedItem] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration_secs).sum()
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.clips.iter().map(|c| c.path.clone()).collect()
    }
}

impl Drop for ClipSet {
    fn drop(&mut self) {
        for clip in self.clips.iter().filter(|c| c.derived) {
            let _ = std::fs::remove_file(&clip.path);
        }
    }
}

/// Output format for `path`: the container its extension names, else `fallback`.
///
/// An extension that names no container we write (`.wav`, or `.aac` for an
/// MP4 file) is logged and the file is encoded as `fallback`.
pub fn format_for_output(path: &Path, fallback: AudioFormat) -> AudioFormat {
    let Some(ext) = path.extension() else {
        return fallback;
    };
    let ext = ext.to_string_lossy();
    match AudioFormat::from_extension(&ext) {
        Some(format) => format,
        None => {
            warn!(
                path = %path.display(),
                format = %fallback,
                "Output extension .{} does not match the container, encoding as .{}",
                ext,
                fallback.extension()
            );
            fallback
        }
    }
}

/// Joins a [`ClipSet`] into one file with an [`AudioToolkit`].
pub struct MashupAssembler<'a, T> {
    toolkit: &'a T,
    encoding: AudioEncoding,
}

impl<'a, T: AudioToolkit> MashupAssembler<'a, T> {
    pub fn new(toolkit: &'a T, encoding: AudioEncoding) -> Self {
        Self { toolkit, encoding }
    }

    /// Concatenate `clips` into `output_path`.
    ///
    /// The artifact is encoded under `scratch_dir` and moved into place only
    /// once complete, so a failure never leaves a partial file at
    /// `output_path`. Fails with [`PipelineError::NoUsableInput`] before
    /// touching the filesystem when the set is empty.
    pub async fn assemble(
        &self,
        clips: ClipSet,
        output_path: &Path,
        scratch_dir: &Path,
    ) -> PipelineResult<MashupArtifact> {
        if clips.is_empty() {
            return Err(PipelineError::NoUsableInput {
                skipped: clips.skipped().len(),
            });
        }

        let encoding = AudioEncoding {
            format: format_for_output(output_path, self.encoding.format),
            bitrate: self.encoding.bitrate.clone(),
        };
        let total_duration = clips.total_duration();

        tokio::fs::create_dir_all(scratch_dir).await?;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staged = scratch_dir.join(format!("mashup.{}", encoding.format.extension()));
        debug!(
            clips = clips.len(),
            staged = %staged.display(),
            format = %encoding.format,
            "Concatenating clips"
        );

        self.toolkit
            .concat(&clips.paths(), &staged, scratch_dir, &encoding, total_duration)
            .await
            .map_err(PipelineError::Assembly)?;

        move_file(&staged, output_path)
            .await
            .map_err(PipelineError::Assembly)?;

        metrics::counter!("mashup_clips_assembled_total").increment(clips.len() as u64);
        info!(
            path = %output_path.display(),
            clips = clips.len(),
            total_duration_secs = total_duration,
            "Mashup written"
        );

        Ok(MashupArtifact {
            path: output_path.to_path_buf(),
            total_duration_secs: total_duration,
            format: encoding.format,
            clip_count: clips.len(),
        })
    }
}

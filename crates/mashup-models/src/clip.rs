//! Audio item, clip and artifact models.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::AudioFormat;

/// One downloaded audio file in the working area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioItem {
    /// Provider-assigned identifier (the video id for YouTube)
    pub source_id: String,
    /// Location inside the working area
    pub path: PathBuf,
}

impl AudioItem {
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A bounded-length segment cut from an [`AudioItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Audio file holding the segment
    pub path: PathBuf,
    /// Length in seconds, never above the requested duration
    pub duration_secs: f64,
    /// Source item identifier, for diagnostics
    pub source_id: String,
    /// True when `path` is a file cut by the trimmer, false for a pass-through
    /// of the original item file
    pub derived: bool,
}

impl Clip {
    /// Clip that is the whole item, unmodified.
    pub fn passthrough(item: &AudioItem, duration_secs: f64) -> Self {
        Self {
            path: item.path.clone(),
            duration_secs,
            source_id: item.source_id.clone(),
            derived: false,
        }
    }

    /// Clip written to its own segment file.
    pub fn segment(item: &AudioItem, path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            source_id: item.source_id.clone(),
            derived: true,
        }
    }
}

/// An item the trimmer could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub source_id: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Per-item result of trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrimOutcome {
    Trimmed(Clip),
    Skipped(SkippedItem),
}

impl TrimOutcome {
    pub fn skipped(item: &AudioItem, reason: impl Into<String>) -> Self {
        TrimOutcome::Skipped(SkippedItem {
            source_id: item.source_id.clone(),
            path: item.path.clone(),
            reason: reason.into(),
        })
    }

    pub fn is_trimmed(&self) -> bool {
        matches!(self, TrimOutcome::Trimmed(_))
    }
}

/// Split outcomes into surviving clips and skipped items, keeping order.
pub fn partition_outcomes(outcomes: Vec<TrimOutcome>) -> (Vec<Clip>, Vec<SkippedItem>) {
    let mut clips = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            TrimOutcome::Trimmed(clip) => clips.push(clip),
            TrimOutcome::Skipped(item) => skipped.push(item),
        }
    }
    (clips, skipped)
}

/// The finished mashup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MashupArtifact {
    pub path: PathBuf,
    /// Sum of the constituent clip durations, in seconds
    pub total_duration_secs: f64,
    pub format: AudioFormat,
    pub clip_count: usize,
}

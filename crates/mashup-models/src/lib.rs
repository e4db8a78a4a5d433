//! Shared data models for the mashup pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Search queries and run requests (with validation)
//! - Downloaded audio items, trimmed clips and the final artifact
//! - Audio output formats
//! - Run identity, pipeline stages and run summaries

pub mod clip;
pub mod format;
pub mod query;
pub mod run;

// Re-export common types
pub use clip::{partition_outcomes, AudioItem, Clip, MashupArtifact, SkippedItem, TrimOutcome};
pub use format::{AudioFormat, AudioFormatParseError, DEFAULT_AUDIO_BITRATE};
pub use query::{
    MashupRequest, Query, RequestError, MIN_COUNT_EXCLUSIVE, MIN_TARGET_DURATION_SECS,
};
pub use run::{FailureKind, PipelineStage, RunId, RunOutcome, RunSummary};

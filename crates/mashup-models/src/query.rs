//! Search query and run request models.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::format::AudioFormat;

/// A request must ask for strictly more videos than this.
pub const MIN_COUNT_EXCLUSIVE: u32 = 10;

/// Shortest allowed per-clip duration, in seconds.
pub const MIN_TARGET_DURATION_SECS: u32 = 20;

/// Rejection reasons for a mashup request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("search term must not be empty")]
    EmptySearchTerm,

    #[error("number of videos must be greater than {MIN_COUNT_EXCLUSIVE}, got {0}")]
    CountTooSmall(u32),

    #[error("audio duration must be at least {MIN_TARGET_DURATION_SECS} seconds, got {0}")]
    DurationTooShort(u32),

    #[error("output path must name a file")]
    InvalidOutput,

    #[error("output extension \".{0}\" is not a supported container (mp3, m4a, flac, opus)")]
    UnsupportedOutputExtension(String),
}

/// What to search for and how many results to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    search_term: String,
    count: u32,
}

impl Query {
    pub fn new(search_term: impl Into<String>, count: u32) -> Self {
        Self {
            search_term: search_term.into(),
            count,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Check the query invariants.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.search_term.trim().is_empty() {
            return Err(RequestError::EmptySearchTerm);
        }
        if self.count <= MIN_COUNT_EXCLUSIVE {
            return Err(RequestError::CountTooSmall(self.count));
        }
        Ok(())
    }
}

/// Everything an entry point supplies for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MashupRequest {
    pub query: Query,
    /// Per-clip duration in seconds
    pub target_duration_secs: u32,
    /// Where the finished artifact is written
    pub output_path: PathBuf,
}

impl MashupRequest {
    pub fn new(
        search_term: impl Into<String>,
        count: u32,
        target_duration_secs: u32,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            query: Query::new(search_term, count),
            target_duration_secs,
            output_path: output_path.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        self.query.validate()?;
        if self.target_duration_secs < MIN_TARGET_DURATION_SECS {
            return Err(RequestError::DurationTooShort(self.target_duration_secs));
        }
        if self.output_path.file_name().is_none() {
            return Err(RequestError::InvalidOutput);
        }
        if let Some(ext) = self.output_path.extension() {
            let ext = ext.to_string_lossy();
            if AudioFormat::from_extension(&ext).is_none() {
                return Err(RequestError::UnsupportedOutputExtension(ext.into_owned()));
            }
        }
        Ok(())
    }

    /// Format the artifact is encoded in: the one its extension names, or
    /// `fallback` when the output path has no extension.
    pub fn output_format(&self, fallback: AudioFormat) -> AudioFormat {
        self.output_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(AudioFormat::from_extension)
            .unwrap_or(fallback)
    }

    pub fn target_duration(&self) -> f64 {
        f64::from(self.target_duration_secs)
    }
}

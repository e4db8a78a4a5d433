//! Pipeline run identity, stages and summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{MashupArtifact, Query, SkippedItem};

/// Unique identifier for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    Validating,
    Acquiring,
    Trimming,
    Assembling,
    Cleaning,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Validating => "validating",
            PipelineStage::Acquiring => "acquiring",
            PipelineStage::Trimming => "trimming",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Cleaning => "cleaning",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Any working stage may fall through to `Cleaning`; only `Cleaning`
    /// reaches a terminal stage.
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (Idle, Validating)
            | (Validating, Acquiring)
            | (Acquiring, Trimming)
            | (Trimming, Assembling)
            | (Cleaning, Done)
            | (Cleaning, Failed) => true,
            (Validating | Acquiring | Trimming | Assembling, Cleaning) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Acquisition,
    NoUsableInput,
    Assembly,
    Interrupted,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Acquisition => "acquisition",
            FailureKind::NoUsableInput => "no_usable_input",
            FailureKind::Assembly => "assembly",
            FailureKind::Interrupted => "interrupted",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Done { artifact: MashupArtifact },
    Failed { kind: FailureKind, message: String },
}

/// Record of one pipeline run, suitable for printing as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub query: Query,
    pub target_duration_secs: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Items materialized by the downloader
    pub acquired: usize,
    /// Items that became clips
    pub assembled: usize,
    /// Items dropped during trimming, with reasons
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedItem>,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Done { .. })
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use PipelineStage::*;
        let path = [Idle, Validating, Acquiring, Trimming, Assembling, Cleaning, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_only_through_cleaning() {
        use PipelineStage::*;
        assert!(!Assembling.can_advance_to(Done));
        assert!(!Acquiring.can_advance_to(Failed));
        assert!(Acquiring.can_advance_to(Cleaning));
        assert!(Cleaning.can_advance_to(Failed));
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert!(!Cleaning.is_terminal());
    }

    #[test]
    fn test_run_id_display() {
        let id = RunId::from_string("run-1");
        assert_eq!(id.to_string(), "run-1");
        assert_ne!(RunId::new(), RunId::new());
    }
}

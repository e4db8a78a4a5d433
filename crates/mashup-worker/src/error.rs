//! Pipeline error types.

use thiserror::Error;

use mashup_media::MediaError;
use mashup_models::{FailureKind, RequestError};

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal outcomes of a pipeline run.
///
/// Per-item trim failures are not errors (see `TrimOutcome::Skipped`), and a
/// failed working-area removal is only logged.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    Validation(#[from] RequestError),

    #[error("Acquisition failed: {message}")]
    Acquisition {
        message: String,
        #[source]
        source: Option<MediaError>,
    },

    #[error("No usable audio: all {skipped} downloaded items failed to decode")]
    NoUsableInput { skipped: usize },

    #[error("Assembly failed: {0}")]
    Assembly(#[source] MediaError),

    #[error("Run interrupted")]
    Interrupted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn acquisition(source: MediaError) -> Self {
        Self::Acquisition {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Acquisition failure without an underlying provider error.
    pub fn nothing_downloaded(message: impl Into<String>) -> Self {
        Self::Acquisition {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Validation(_) => FailureKind::Validation,
            PipelineError::Acquisition { .. } => FailureKind::Acquisition,
            PipelineError::NoUsableInput { .. } => FailureKind::NoUsableInput,
            PipelineError::Assembly(_) => FailureKind::Assembly,
            PipelineError::Interrupted => FailureKind::Interrupted,
            PipelineError::Config(_) | PipelineError::Io(_) => FailureKind::Internal,
        }
    }

    /// Whether another acquisition attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Acquisition {
                source: Some(source),
                ..
            } => is_retryable_media_error(source),
            _ => false,
        }
    }

    /// Process exit code for the command-line entry point.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            FailureKind::Validation => 2,
            FailureKind::Acquisition => 3,
            FailureKind::NoUsableInput => 4,
            FailureKind::Assembly => 5,
            FailureKind::Interrupted => 130,
            FailureKind::Internal => 1,
        }
    }
}

/// Whether a provider error is worth another attempt.
///
/// Missing tools and content that is gone for good (private, removed,
/// region-blocked) will fail the same way again.
pub fn is_retryable_media_error(err: &MediaError) -> bool {
    match err {
        MediaError::DownloadFailed { message, .. } => !is_permanent_provider_message(message),
        MediaError::Io(_) | MediaError::Timeout(_) => true,
        _ => false,
    }
}

fn is_permanent_provider_message(message: &str) -> bool {
    let msg = message.to_lowercase();

    msg.contains("private video")
        || msg.contains("video unavailable")
        || msg.contains("video has been removed")
        || msg.contains("not available in your country")
        || (msg.contains("copyright") && msg.contains("block"))
        || msg.contains("unsupported url")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let no_input = PipelineError::NoUsableInput { skipped: 11 };
        let nothing = PipelineError::nothing_downloaded("provider returned no items");
        assert_eq!(no_input.kind(), FailureKind::NoUsableInput);
        assert_eq!(nothing.kind(), FailureKind::Acquisition);
        assert_ne!(no_input.exit_code(), nothing.exit_code());
    }

    #[test]
    fn test_validation_from_request_error() {
        let err: PipelineError = RequestError::CountTooSmall(5).into();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(err.to_string().contains("greater than 10"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PipelineError::acquisition(MediaError::rate_limited("HTTP Error 429")).is_retryable());
        assert!(PipelineError::acquisition(MediaError::download_failed("timed out")).is_retryable());
        assert!(!PipelineError::acquisition(MediaError::download_failed(
            "ERROR: Private video. Sign in if you've been granted access"
        ))
        .is_retryable());
        assert!(!PipelineError::acquisition(MediaError::YtDlpNotFound).is_retryable());
        assert!(!PipelineError::nothing_downloaded("empty").is_retryable());
        assert!(!PipelineError::NoUsableInput { skipped: 1 }.is_retryable());
    }
}

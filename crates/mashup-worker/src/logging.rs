//! Structured run logging and tracing subscriber setup.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mashup_models::{PipelineStage, RunId};

/// Logger carrying the run id and current stage into every lifecycle line.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    stage: PipelineStage,
}

impl RunLogger {
    pub fn new(run_id: &RunId) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: PipelineStage::Idle,
        }
    }

    /// Record a stage transition.
    ///
    /// Transitions the run state machine does not allow are logged as
    /// warnings and reported by returning `false`; the stage is still recorded.
    pub fn enter(&mut self, stage: PipelineStage) -> bool {
        let allowed = self.stage.can_advance_to(stage);
        if allowed {
            info!(
                run_id = %self.run_id,
                from = %self.stage,
                to = %stage,
                "Stage transition"
            );
        } else {
            warn!(
                run_id = %self.run_id,
                from = %self.stage,
                to = %stage,
                "Illegal stage transition"
            );
        }
        self.stage = stage;
        allowed
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, stage = %self.stage, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, stage = %self.stage, "{}", message);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `mashup=info` filter; `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mashup=info,mashup_worker=info,mashup_media=info"));

    // Logs go to stderr so stdout carries only the result
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

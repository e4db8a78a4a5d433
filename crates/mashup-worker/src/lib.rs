//! Audio mashup pipeline.
//!
//! This crate provides:
//! - Acquisition of search results as audio files (with retry)
//! - Per-item trimming to a target duration
//! - Ordered assembly into one artifact
//! - Scoped working-area cleanup on every exit path

pub mod acquire;
pub mod assembler;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod retry;
pub mod trimmer;
pub mod working_area;

pub use acquire::MediaAcquirer;
pub use assembler::{format_for_output, ClipSet, MashupAssembler};
pub use config::{PipelineConfig, MAX_TRIM_PARALLEL};
pub use error::{is_retryable_media_error, PipelineError, PipelineResult};
pub use logging::{init_tracing, RunLogger};
pub use pipeline::{interrupted_summary, PipelineOrchestrator, RunReport};
pub use retry::{retry_async, RetryConfig, RetryExhausted};
pub use trimmer::ClipTrimmer;
pub use working_area::WorkingArea;

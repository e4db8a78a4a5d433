//! Pipeline orchestration.
//!
//! Drives one run through validate -> acquire -> trim -> assemble and always
//! finishes with cleaning up the working area, whatever the outcome.

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::Instrument;

use mashup_media::{AudioEncoding, AudioToolkit, FfmpegRunner, FfmpegToolkit, MediaSource, YtDlpSource};
use mashup_models::{
    partition_outcomes, MashupArtifact, MashupRequest, PipelineStage, RunId, RunOutcome,
    RunSummary, SkippedItem,
};

use crate::acquire::MediaAcquirer;
use crate::assembler::{ClipSet, MashupAssembler};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::retry::RetryConfig;
use crate::trimmer::ClipTrimmer;
use crate::working_area::WorkingArea;

/// Result of a run plus the summary describing it.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub result: PipelineResult<MashupArtifact>,
}

/// Counts gathered while the stages run.
#[derive(Debug, Default)]
struct Tally {
    acquired: usize,
    assembled: usize,
    skipped: Vec<SkippedItem>,
}

/// Runs mashup requests against a media source and an audio toolkit.
pub struct PipelineOrchestrator<S, T> {
    config: PipelineConfig,
    source: S,
    toolkit: T,
}

impl PipelineOrchestrator<YtDlpSource, FfmpegToolkit> {
    /// yt-dlp for acquisition, FFmpeg for trimming and assembly.
    pub fn from_config(config: PipelineConfig) -> Self {
        let source = YtDlpSource::new(config.identity.clone(), config.encoding.bitrate.clone());
        let toolkit = FfmpegToolkit::new(
            FfmpegRunner::new().with_optional_timeout(config.ffmpeg_timeout_secs),
        );
        Self::new(config, source, toolkit)
    }
}

impl<S: MediaSource, T: AudioToolkit> PipelineOrchestrator<S, T> {
    pub fn new(config: PipelineConfig, source: S, toolkit: T) -> Self {
        Self {
            config,
            source,
            toolkit,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce the mashup for `request`.
    pub async fn run(&self, request: &MashupRequest) -> PipelineResult<MashupArtifact> {
        self.execute(request).await.result
    }

    /// Produce the mashup for `request` under a fresh run id.
    pub async fn execute(&self, request: &MashupRequest) -> RunReport {
        self.execute_with_id(request, RunId::new()).await
    }

    /// Produce the mashup for `request`, reporting under `run_id`.
    ///
    /// Dropping the returned future mid-run kills any running tool and
    /// removes the working area.
    pub async fn execute_with_id(&self, request: &MashupRequest, run_id: RunId) -> RunReport {
        let mut logger = RunLogger::new(&run_id);
        let span = logger.create_span();

        async move {
            let started_at = Utc::now();
            let timer = Instant::now();
            let mut tally = Tally::default();
            let mut area: Option<WorkingArea> = None;

            logger.log_progress(&format!(
                "Starting mashup: term=\"{}\" count={} duration={}s output={}",
                request.query.search_term(),
                request.query.count(),
                request.target_duration_secs,
                request.output_path.display()
            ));

            let result = self
                .run_stages(request, &run_id, &mut logger, &mut area, &mut tally)
                .await;

            logger.enter(PipelineStage::Cleaning);
            if let Some(mut area) = area.take() {
                if let Err(e) = area.cleanup().await {
                    logger.log_warning(&format!(
                        "Failed to remove working area {}: {}",
                        area.path().display(),
                        e
                    ));
                }
            }

            let elapsed = timer.elapsed().as_secs_f64();
            metrics::histogram!("mashup_run_duration_seconds").record(elapsed);

            let outcome = match &result {
                Ok(artifact) => {
                    logger.enter(PipelineStage::Done);
                    metrics::counter!("mashup_runs_total", "outcome" => "done").increment(1);
                    RunOutcome::Done {
                        artifact: artifact.clone(),
                    }
                }
                Err(e) => {
                    logger.enter(PipelineStage::Failed);
                    logger.log_error(&format!("Run failed: {}", e));
                    metrics::counter!("mashup_runs_total", "outcome" => e.kind().as_str())
                        .increment(1);
                    RunOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };

            let summary = RunSummary {
                run_id,
                query: request.query.clone(),
                target_duration_secs: request.target_duration_secs,
                started_at,
                finished_at: Utc::now(),
                acquired: tally.acquired,
                assembled: tally.assembled,
                skipped: tally.skipped,
                outcome,
            };

            RunReport { summary, result }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        request: &MashupRequest,
        run_id: &RunId,
        logger: &mut RunLogger,
        area: &mut Option<WorkingArea>,
        tally: &mut Tally,
    ) -> PipelineResult<MashupArtifact> {
        logger.enter(PipelineStage::Validating);
        request.validate()?;
        let encoding = AudioEncoding {
            format: request.output_format(self.config.encoding.format),
            bitrate: self.config.encoding.bitrate.clone(),
        };

        logger.enter(PipelineStage::Acquiring);
        let area = area.insert(WorkingArea::create(&self.config.work_root, run_id).await?);
        let retry = RetryConfig::new("acquire")
            .with_max_retries(self.config.acquire_retries)
            .with_base_delay(self.config.acquire_backoff);
        let items = MediaAcquirer::new(&self.source, self.config.encoding.format, retry)
            .acquire(&request.query, area.path())
            .await?;
        tally.acquired = items.len();
        logger.log_progress(&format!("Acquired {} items", items.len()));

        logger.enter(PipelineStage::Trimming);
        let outcomes = ClipTrimmer::new(&self.toolkit, area.clips_dir(), request.target_duration())
            .with_max_parallel(self.config.max_trim_parallel)
            .trim_all(&items)
            .await;
        let (clips, skipped) = partition_outcomes(outcomes);
        if !skipped.is_empty() {
            logger.log_warning(&format!(
                "{} of {} items skipped: {}",
                skipped.len(),
                items.len(),
                skipped
                    .iter()
                    .map(|s| s.source_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        tally.skipped = skipped.clone();

        logger.enter(PipelineStage::Assembling);
        let artifact = MashupAssembler::new(&self.toolkit, encoding)
            .assemble(
                ClipSet::new(clips, skipped),
                &request.output_path,
                &area.scratch_dir(),
            )
            .await?;
        tally.assembled = artifact.clip_count;

        Ok(artifact)
    }
}

/// Summary for a run abandoned before it could report on its own.
pub fn interrupted_summary(
    run_id: RunId,
    request: &MashupRequest,
    started_at: DateTime<Utc>,
) -> RunSummary {
    let err = PipelineError::Interrupted;
    RunSummary {
        run_id,
        query: request.query.clone(),
        target_duration_secs: request.target_duration_secs,
        started_at,
        finished_at: Utc::now(),
        acquired: 0,
        assembled: 0,
        skipped: Vec::new(),
        outcome: RunOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        },
    }
}

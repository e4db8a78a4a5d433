//! End-to-end pipeline tests against in-process providers.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use mashup_media::{AudioEncoding, AudioToolkit, MediaError, MediaResult, MediaSource};
use mashup_models::{AudioFormat, AudioItem, FailureKind, MashupRequest, Query, RunId, RunOutcome};
use mashup_worker::{PipelineConfig, PipelineError, PipelineOrchestrator, WorkingArea};

/// Writes one file per entry of `catalog`; the file body is the item duration
/// in seconds, or anything unparseable for a corrupt download.
struct CatalogSource {
    catalog: Vec<&'static str>,
    fail_with: Option<fn() -> MediaError>,
    calls: Arc<AtomicU32>,
}

impl CatalogSource {
    fn new(catalog: Vec<&'static str>) -> Self {
        Self {
            catalog,
            fail_with: None,
            calls: Arc::default(),
        }
    }

    fn failing(error: fn() -> MediaError) -> Self {
        Self {
            catalog: Vec::new(),
            fail_with: Some(error),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl MediaSource for CatalogSource {
    async fn fetch(&self, query: &Query, dest: &Path, format: AudioFormat) -> MediaResult<Vec<AudioItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_with {
            return Err(error());
        }
        let mut items = Vec::new();
        for (i, body) in self.catalog.iter().take(query.count() as usize).enumerate() {
            let id = format!("vid{:02}", i + 1);
            let path = dest.join(format!("{:03}-{}.{}", i + 1, id, format.extension()));
            tokio::fs::write(&path, body).await?;
            items.push(AudioItem::new(id, path));
        }
        Ok(items)
    }
}

/// Reads durations from file bodies and joins inputs by listing their names.
#[derive(Default)]
struct TextToolkit;

#[async_trait]
impl AudioToolkit for TextToolkit {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        let body = tokio::fs::read_to_string(path).await?;
        body.trim()
            .parse()
            .map_err(|_| MediaError::invalid_audio("No audio stream found"))
    }

    async fn extract_head(&self, _input: &Path, output: &Path, duration: f64) -> MediaResult<()> {
        tokio::fs::write(output, duration.to_string()).await?;
        Ok(())
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        _scratch_dir: &Path,
        _encoding: &AudioEncoding,
        _expected_secs: f64,
    ) -> MediaResult<()> {
        for input in inputs {
            if !input.exists() {
                return Err(MediaError::FileNotFound(input.clone()));
            }
        }
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        tokio::fs::write(output, names.join("\n")).await?;
        Ok(())
    }
}

fn config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default().with_work_root(root.join("work"));
    config.acquire_backoff = Duration::from_millis(1);
    config
}

fn eleven_items_one_corrupt() -> Vec<&'static str> {
    vec![
        "185.0", "240.5", "corrupt", "200", "199.9", "320", "61", "75.25", "90", "300", "45",
    ]
}

fn work_area_is_empty(root: &Path) -> bool {
    match std::fs::read_dir(root.join("work")) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_corrupt_item_is_skipped_and_rest_assembled() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("mix.mp3");
    let orchestrator = PipelineOrchestrator::new(
        config(root.path()),
        CatalogSource::new(eleven_items_one_corrupt()),
        TextToolkit::default(),
    );

    let report = orchestrator
        .execute(&MashupRequest::new("Test Artist", 11, 20, &output))
        .await;

    let artifact = report.result.unwrap();
    assert_eq!(artifact.clip_count, 10);
    assert!((artifact.total_duration_secs - 200.0).abs() < 1e-6);
    assert!(output.exists());

    assert_eq!(report.summary.acquired, 11);
    assert_eq!(report.summary.assembled, 10);
    assert_eq!(report.summary.skipped.len(), 1);
    assert_eq!(report.summary.skipped[0].source_id, "vid03");
    assert!(report.summary.is_success());

    assert!(work_area_is_empty(root.path()));
}

#[tokio::test]
async fn test_clips_keep_acquisition_order() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("mix.mp3");
    let orchestrator = PipelineOrchestrator::new(
        config(root.path()).with_max_trim_parallel(4),
        CatalogSource::new(eleven_items_one_corrupt()),
        TextToolkit::default(),
    );

    orchestrator
        .run(&MashupRequest::new("Test Artist", 11, 20, &output))
        .await
        .unwrap();

    let body = std::fs::read_to_string(&output).unwrap();
    let order: Vec<&str> = body.lines().collect();
    assert_eq!(order.len(), 10);
    assert_eq!(order[0], "001-vid01.mp3");
    assert_eq!(order[2], "004-vid04.mp3");
    assert_eq!(order[9], "011-vid11.mp3");
}

#[tokio::test]
async fn test_short_items_are_used_whole() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("mix.mp3");
    let toolkit = TextToolkit::default();
    let catalog = vec!["15", "30", "12.5", "40", "40", "40", "40", "40", "40", "40", "40"];
    let orchestrator = PipelineOrchestrator::new(config(root.path()), CatalogSource::new(catalog), toolkit);

    let artifact = orchestrator
        .run(&MashupRequest::new("Test Artist", 11, 20, &output))
        .await
        .unwrap();

    // 15 + 20 + 12.5 + 8 * 20
    assert!((artifact.total_duration_secs - 207.5).abs() < 1e-6);
}

#[tokio::test]
async fn test_invalid_request_fails_before_acquisition() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("mix.mp3");
    let source = CatalogSource::new(eleven_items_one_corrupt());
    let calls = source.calls.clone();
    let orchestrator = PipelineOrchestrator::new(config(root.path()), source, TextToolkit::default());

    let report = orchestrator
        .execute(&MashupRequest::new("Test Artist", 5, 20, &output))
        .await;

    assert!(matches!(report.result, Err(PipelineError::Validation(_))));
    assert!(matches!(
        report.summary.outcome,
        RunOutcome::Failed {
            kind: FailureKind::Validation,
            ..
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!root.path().join("work").exists());
    assert!(!output.exists());

    let err = orchestrator
        .run(&MashupRequest::new("Test Artist", 11, 19, &output))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_output_extension_must_match_container() {
    let root = TempDir::new().unwrap();
    let source = CatalogSource::new(eleven_items_one_corrupt());
    let calls = source.calls.clone();
    let orchestrator = PipelineOrchestrator::new(config(root.path()), source, TextToolkit::default());

    for name in ["mix.wav", "mix.aac"] {
        let output = root.path().join(name);
        let err = orchestrator
            .run(&MashupRequest::new("Test Artist", 11, 20, &output))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(!output.exists());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let output = root.path().join("mix.m4a");
    let artifact = orchestrator
        .run(&MashupRequest::new("Test Artist", 11, 20, &output))
        .await
        .unwrap();
    assert_eq!(artifact.format, AudioFormat::Aac);
}

#[tokio::test]
async fn test_all_items_corrupt_is_no_usable_input() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("mix.mp3");
    let catalog = vec!["corrupt"; 11];
    let orchestrator = PipelineOrchestrator::new(
        config(root.path()),
        CatalogSource::new(catalog),
        TextToolkit::default(),
    );

    let err = orchestrator
        .run(&MashupRequest::new("Test Artist", 11, 20, &output))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoUsableInput { skipped: 11 }));
    assert!(!output.exists());
    assert!(work_area_is_empty(root.path()));
}

#[tokio::test]
async fn test_provider_failure_cleans_up() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("mix.mp3");
    let source = CatalogSource::failing(|| MediaError::download_failed("ERROR: unable to resolve host"));
    let calls = source.calls.clone();
    let orchestrator = PipelineOrchestrator::new(config(root.path()), source, TextToolkit::default());

    let report = orchestrator
        .execute(&MashupRequest::new("Test Artist", 11, 20, &output))
        .await;

    assert!(matches!(report.result, Err(PipelineError::Acquisition { .. })));
    assert_eq!(report.summary.acquired, 0);
    // first attempt plus two retries
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!output.exists());
    assert!(work_area_is_empty(root.path()));
}

#[tokio::test]
async fn test_repeated_runs_use_distinct_areas() {
    let root = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(
        config(root.path()),
        CatalogSource::new(eleven_items_one_corrupt()),
        TextToolkit::default(),
    );

    for name in ["a.mp3", "b.mp3"] {
        let output = root.path().join(name);
        let report = orchestrator
            .execute(&MashupRequest::new("Test Artist", 11, 20, &output))
            .await;
        assert!(report.result.is_ok());
        assert!(!WorkingArea::path_for(&root.path().join("work"), &report.summary.run_id).exists());
    }
}

#[tokio::test]
async fn test_abandoned_run_removes_working_area() {
    struct StallingSource;

    #[async_trait]
    impl MediaSource for StallingSource {
        async fn fetch(&self, _: &Query, dest: &Path, _: AudioFormat) -> MediaResult<Vec<AudioItem>> {
            tokio::fs::write(dest.join("001-partial.mp3.part"), b"...").await?;
            std::future::pending().await
        }
    }

    let root = TempDir::new().unwrap();
    let orchestrator = PipelineOrchestrator::new(config(root.path()), StallingSource, TextToolkit::default());
    let run_id = RunId::from_string("abandoned");
    let request = MashupRequest::new("Test Artist", 11, 20, root.path().join("mix.mp3"));

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        orchestrator.execute_with_id(&request, run_id.clone()),
    )
    .await;

    assert!(outcome.is_err());
    assert!(!WorkingArea::path_for(&root.path().join("work"), &run_id).exists());
}

#[tokio::test]
#[ignore = "requires yt-dlp, ffmpeg and network access"]
async fn test_live_mashup() {
    dotenvy::dotenv().ok();

    let root = TempDir::new().unwrap();
    let output = root.path().join("live.mp3");
    let config = PipelineConfig::from_env().unwrap().with_work_root(root.path().join("work"));
    let orchestrator = PipelineOrchestrator::from_config(config);

    let artifact = orchestrator
        .run(&MashupRequest::new("Sharry Maan", 11, 20, &output))
        .await
        .unwrap();

    assert!(artifact.clip_count > 0);
    assert!(output.exists());
}

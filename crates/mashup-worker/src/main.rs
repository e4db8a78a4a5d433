//! Mashup command-line entry point.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use mashup_models::{MashupRequest, RunId, RunSummary};
use mashup_worker::{init_tracing, interrupted_summary, PipelineConfig, PipelineError, PipelineOrchestrator};

/// Build an audio mashup from the top search results for a term
#[derive(Parser, Debug)]
#[command(name = "mashup", author, version, about, long_about = None)]
struct Cli {
    /// Free-form search term (usually an artist or singer name)
    search_term: String,
    /// Number of results to fetch (must be greater than 10)
    count: u32,
    /// Seconds of audio taken from each result (at least 20)
    duration: u32,
    /// Path of the mashup to write; the extension selects the format
    output: PathBuf,
    /// Parent directory for the per-run working area
    #[arg(long, env = "MASHUP_WORK_ROOT")]
    work_root: Option<PathBuf>,
    /// Items trimmed concurrently
    #[arg(short, long, env = "MASHUP_MAX_TRIM_PARALLEL")]
    parallel: Option<usize>,
    /// Print the run summary as JSON instead of the artifact path
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = PipelineConfig::from_env().context("Failed to load configuration")?;
    if let Some(root) = cli.work_root {
        config = config.with_work_root(root);
    }
    if let Some(n) = cli.parallel {
        config = config.with_max_trim_parallel(n);
    }
    config.validate().context("Invalid configuration")?;

    let request = MashupRequest::new(cli.search_term, cli.count, cli.duration, cli.output);
    let orchestrator = PipelineOrchestrator::from_config(config);
    let run_id = RunId::new();
    let started_at = Utc::now();

    info!(run_id = %run_id, "Starting mashup run");

    let (summary, result) = tokio::select! {
        report = orchestrator.execute_with_id(&request, run_id.clone()) => {
            (report.summary, report.result)
        }
        _ = tokio::signal::ctrl_c() => {
            // The run future is dropped here; child tools die with it and the
            // working area is removed by its guard.
            warn!(run_id = %run_id, "Interrupted, abandoning run");
            (
                interrupted_summary(run_id, &request, started_at),
                Err(PipelineError::Interrupted),
            )
        }
    };

    report(&summary, cli.json)?;

    match result {
        Ok(_) => Ok(0),
        Err(e) => {
            if !cli.json {
                eprintln!("error: {}", e);
            }
            Ok(e.exit_code())
        }
    }
}

fn report(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else if let mashup_models::RunOutcome::Done { artifact } = &summary.outcome {
        println!("{}", artifact.path.display());
        info!(
            clips = artifact.clip_count,
            skipped = summary.skipped.len(),
            total_duration_secs = artifact.total_duration_secs,
            elapsed_secs = summary.elapsed_secs(),
            "Mashup complete"
        );
    }
    Ok(())
}

//! Search-and-download of audio using yt-dlp.
//!
//! A single yt-dlp invocation resolves `ytsearchN:<term>`, downloads the best
//! audio of every hit and converts it to the requested format. yt-dlp runs with
//! `--ignore-errors`, so one unavailable video does not abort the batch; the
//! batch only fails when nothing at all was materialized.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use mashup_models::{AudioFormat, AudioItem, Query};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};
use crate::provider::MediaSource;

/// Desktop browser user agent presented to the provider.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Binding to the IPv4 wildcard forces yt-dlp onto IPv4.
pub const DEFAULT_SOURCE_ADDRESS: &str = "0.0.0.0";

/// File name template: zero-padded search rank, then the video id.
const OUTPUT_TEMPLATE: &str = "%(playlist_index)03d-%(id)s.%(ext)s";

/// How the downloader presents itself to the provider.
///
/// Reduces request rejection; has no bearing on correctness.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Local address to bind outgoing connections to
    pub source_address: Option<String>,
    pub user_agent: String,
    /// Extra `Name:Value` request headers
    pub headers: Vec<String>,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            source_address: Some(DEFAULT_SOURCE_ADDRESS.to_string()),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: vec!["Accept-Language:en-US,en;q=0.5".to_string()],
        }
    }
}

/// yt-dlp backed [`MediaSource`].
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    identity: ClientIdentity,
    /// Bitrate handed to yt-dlp's audio extraction, e.g. "192k"
    audio_quality: String,
}

impl YtDlpSource {
    pub fn new(identity: ClientIdentity, audio_quality: impl Into<String>) -> Self {
        Self {
            identity,
            audio_quality: audio_quality.into(),
        }
    }

    /// Build the yt-dlp argument list for one search batch.
    pub fn build_args(&self, query: &Query, dest: &Path, format: AudioFormat) -> Vec<String> {
        let template = dest.join(OUTPUT_TEMPLATE);

        let mut args: Vec<String> = vec![
            "--ignore-errors".into(),
            "--no-playlist".into(),
            "--no-progress".into(),
            "--quiet".into(),
            "-f".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            format.ytdlp_name().into(),
        ];

        if format.is_lossy() {
            args.push("--audio-quality".into());
            args.push(self.audio_quality.to_uppercase());
        }

        args.push("--user-agent".into());
        args.push(self.identity.user_agent.clone());

        for header in &self.identity.headers {
            args.push("--add-header".into());
            args.push(header.clone());
        }

        if let Some(addr) = &self.identity.source_address {
            args.push("--source-address".into());
            args.push(addr.clone());
        }

        args.push("-o".into());
        args.push(template.to_string_lossy().to_string());
        args.push(search_expression(query));

        args
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new(ClientIdentity::default(), mashup_models::DEFAULT_AUDIO_BITRATE)
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn fetch(&self, query: &Query, dest: &Path, format: AudioFormat) -> MediaResult<Vec<AudioItem>> {
        tokio::fs::create_dir_all(dest).await?;
        check_ytdlp()?;

        info!(
            search_term = %query.search_term(),
            count = query.count(),
            dest = %dest.display(),
            "Downloading search results with yt-dlp"
        );

        let args = self.build_args(query, dest, format);
        debug!("Running yt-dlp {}", args.join(" "));

        let output = Command::new("yt-dlp")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let items = enumerate_audio_items(dest, format).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            info!(materialized = items.len(), "yt-dlp batch finished");
            return Ok(items);
        }

        debug!("yt-dlp stderr: {}", stderr);

        if !items.is_empty() {
            // Some entries failed; the rest are usable
            warn!(
                materialized = items.len(),
                requested = query.count(),
                exit_code = ?output.status.code(),
                "yt-dlp reported errors for part of the batch"
            );
            return Ok(items);
        }

        let last_line = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error");

        if is_rate_limited(&stderr) {
            warn!(search_term = %query.search_term(), "Provider rate limit detected");
            return Err(MediaError::rate_limited(format!("yt-dlp rejected: {}", last_line)));
        }

        Err(MediaError::download_failed(format!("yt-dlp failed: {}", last_line)))
    }
}

/// `ytsearchN:<term>` expression for yt-dlp.
pub fn search_expression(query: &Query) -> String {
    format!("ytsearch{}:{}", query.count(), query.search_term().trim())
}

/// List finished audio files in `dir`, ordered by search rank.
///
/// The rank is the numeric `NNN-` prefix; files without one follow, by name.
/// Partial downloads and files of other formats are ignored.
pub async fn enumerate_audio_items(dir: &Path, format: AudioFormat) -> MediaResult<Vec<AudioItem>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_format = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(format.extension()));
        if matches_format && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }

    let mut ranked: Vec<(Option<u64>, String, PathBuf)> = paths
        .into_iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            (split_rank(&stem).map(|(rank, _)| rank), stem, path)
        })
        .collect();
    // Unranked files go after every ranked one
    ranked.sort_by(|a, b| {
        (a.0.unwrap_or(u64::MAX), &a.1).cmp(&(b.0.unwrap_or(u64::MAX), &b.1))
    });

    Ok(ranked
        .into_iter()
        .map(|(_, stem, path)| AudioItem::new(source_id_from_stem(&stem), path))
        .collect())
}

/// Split `NNN-id` into its numeric rank and the id.
fn split_rank(stem: &str) -> Option<(u64, &str)> {
    let (rank, id) = stem.split_once('-')?;
    if rank.is_empty() || !rank.bytes().all(|b| b.is_ascii_digit()) || id.is_empty() {
        return None;
    }
    Some((rank.parse().ok()?, id))
}

/// Strip the `NNN-` rank prefix written by the output template.
fn source_id_from_stem(stem: &str) -> String {
    match split_rank(stem) {
        Some((_, id)) => id.to_string(),
        None => stem.to_string(),
    }
}

/// Detect provider throttling in yt-dlp output.
pub fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("HTTP Error 429")
        || stderr.contains("HTTP Error 403")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm")
}

//! Gapless concatenation of audio files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use mashup_models::{AudioFormat, DEFAULT_AUDIO_BITRATE};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_file_if_exists;

/// Encoding of the concatenated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioEncoding {
    pub format: AudioFormat,
    /// Bitrate for lossy formats, e.g. "192k"
    pub bitrate: String,
}

impl Default for AudioEncoding {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

/// Render a concat-demuxer list file body.
pub fn concat_list_body(inputs: &[PathBuf]) -> String {
    let mut body = String::new();
    for path in inputs {
        // Single quotes close, escape and reopen the quoted string
        let escaped = path.to_string_lossy().replace('\'', r"'\''");
        body.push_str("file '");
        body.push_str(&escaped);
        body.push_str("'\n");
    }
    body
}

/// Concatenate `inputs` in order into `output`, re-encoding once.
///
/// `list_path` receives the demuxer list and is removed afterwards whether or
/// not encoding succeeds. `expected_secs` only feeds progress logging.
pub async fn concat_audio(
    runner: &FfmpegRunner,
    inputs: &[PathBuf],
    list_path: &Path,
    output: &Path,
    encoding: &AudioEncoding,
    expected_secs: f64,
) -> MediaResult<()> {
    if inputs.is_empty() {
        return Err(MediaError::EmptyInput);
    }

    tokio::fs::write(list_path, concat_list_body(inputs)).await?;

    let mut cmd = FfmpegCommand::new(list_path, output)
        .concat_list()
        .no_video()
        .audio_codec(encoding.format.codec_arg());
    if encoding.format.is_lossy() {
        cmd = cmd.audio_bitrate(&encoding.bitrate);
    }

    info!(
        inputs = inputs.len(),
        output = %output.display(),
        format = %encoding.format,
        "Concatenating audio"
    );

    let total_ms = (expected_secs * 1000.0) as i64;
    let result = runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(total_ms),
                eta_secs = ?progress.eta_seconds(total_ms),
                "Concat progress"
            );
        })
        .await;

    if let Err(e) = remove_file_if_exists(list_path).await {
        debug!("Failed to remove concat list {}: {}", list_path.display(), e);
    }

    result
}

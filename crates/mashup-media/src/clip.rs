//! Audio clip cutting.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Write the first `duration` seconds of `input` to `output`.
///
/// Streams are copied, not re-encoded, so the cut lands on the nearest audio
/// frame boundary. Video streams (embedded cover art) are dropped.
pub async fn extract_head(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    duration: f64,
) -> MediaResult<()> {
    debug!(
        "Extracting head: {} -> {} (duration: {:.2}s)",
        input.display(),
        output.display(),
        duration
    );

    let cmd = FfmpegCommand::new(input, output)
        .duration(duration)
        .no_video()
        .codec_copy();

    runner.run(&cmd).await
}

//! Audio output format definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default artifact bitrate, matching what the downloader extracts.
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Container/codec of downloaded items and of the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MP3 using libmp3lame
    #[default]
    Mp3,
    /// AAC in an M4A container
    Aac,
    /// FLAC (lossless)
    Flac,
    /// Opus using libopus
    Opus,
}

impl AudioFormat {
    pub const ALL: &'static [AudioFormat] = &[
        AudioFormat::Mp3,
        AudioFormat::Aac,
        AudioFormat::Flac,
        AudioFormat::Opus,
    ];

    /// FFmpeg encoder name for this format.
    pub fn codec_arg(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "libopus",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
        }
    }

    /// Name yt-dlp expects for `--audio-format`.
    pub fn ytdlp_name(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
        }
    }

    /// Format whose container uses extension `ext`, ignoring case.
    ///
    /// Stricter than parsing: `aac` names the codec but the file is written
    /// as MP4, so only `m4a` maps to [`AudioFormat::Aac`].
    pub fn from_extension(ext: &str) -> Option<AudioFormat> {
        AudioFormat::ALL
            .iter()
            .copied()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Whether a bitrate setting applies to the encoder.
    pub fn is_lossy(&self) -> bool {
        !matches!(self, AudioFormat::Flac)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = AudioFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "aac" | "m4a" => Ok(AudioFormat::Aac),
            "flac" => Ok(AudioFormat::Flac),
            "opus" => Ok(AudioFormat::Opus),
            _ => Err(AudioFormatParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown audio format: {0}")]
pub struct AudioFormatParseError(String);

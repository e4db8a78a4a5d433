//! yt-dlp and FFmpeg CLI wrappers for building audio mashups.
//!
//! This crate provides:
//! - Search-and-download of audio via yt-dlp with a fixed client identity
//! - FFprobe audio inspection
//! - Type-safe FFmpeg command building with progress parsing
//! - Head trimming and gapless concatenation
//! - The provider traits the pipeline is written against

pub mod clip;
pub mod command;
pub mod concat;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod provider;

pub use clip::extract_head;
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use concat::{concat_audio, AudioEncoding};
pub use download::{enumerate_audio_items, ClientIdentity, YtDlpSource};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, remove_dir_if_exists, remove_file_if_exists};
pub use probe::{probe_audio, AudioInfo};
pub use progress::FfmpegProgress;
pub use provider::{AudioToolkit, FfmpegToolkit, MediaSource};

//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mashup_media::{AudioEncoding, ClientIdentity};
use mashup_models::AudioFormat;

use crate::error::{PipelineError, PipelineResult};

/// Upper bound on trim concurrency.
pub const MAX_TRIM_PARALLEL: usize = 8;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent directory of per-run working areas
    pub work_root: PathBuf,
    /// Items trimmed concurrently (1 = strictly sequential)
    pub max_trim_parallel: usize,
    /// Retries of a wholly failed acquisition batch
    pub acquire_retries: u32,
    /// Base backoff between acquisition attempts
    pub acquire_backoff: Duration,
    /// Format and bitrate of downloads and of the artifact
    pub encoding: AudioEncoding,
    /// Per FFmpeg invocation
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Identity presented to the search/download provider
    pub identity: ClientIdentity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            max_trim_parallel: 1,
            acquire_retries: 2,
            acquire_backoff: Duration::from_secs(2),
            encoding: AudioEncoding::default(),
            ffmpeg_timeout_secs: None,
            identity: ClientIdentity::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from `MASHUP_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> PipelineResult<Self> {
        let defaults = Self::default();

        let encoding = AudioEncoding {
            format: env_parse("MASHUP_AUDIO_FORMAT")?.unwrap_or(defaults.encoding.format),
            bitrate: env_string("MASHUP_AUDIO_BITRATE").unwrap_or(defaults.encoding.bitrate),
        };

        let mut identity = defaults.identity;
        if let Some(addr) = env_string("MASHUP_SOURCE_ADDRESS") {
            // An explicit empty value disables address binding
            identity.source_address = (!addr.is_empty()).then_some(addr);
        }
        if let Some(ua) = env_string("MASHUP_USER_AGENT").filter(|s| !s.is_empty()) {
            identity.user_agent = ua;
        }

        let config = Self {
            work_root: env_string("MASHUP_WORK_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_root),
            max_trim_parallel: env_parse("MASHUP_MAX_TRIM_PARALLEL")?
                .unwrap_or(defaults.max_trim_parallel),
            acquire_retries: env_parse("MASHUP_ACQUIRE_RETRIES")?.unwrap_or(defaults.acquire_retries),
            acquire_backoff: env_parse("MASHUP_ACQUIRE_BACKOFF_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_backoff),
            encoding,
            ffmpeg_timeout_secs: env_parse("MASHUP_FFMPEG_TIMEOUT_SECS")?,
            identity,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    pub fn with_max_trim_parallel(mut self, n: usize) -> Self {
        self.max_trim_parallel = n;
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.encoding.format = format;
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.max_trim_parallel == 0 || self.max_trim_parallel > MAX_TRIM_PARALLEL {
            return Err(PipelineError::config_error(format!(
                "trim parallelism must be between 1 and {}, got {}",
                MAX_TRIM_PARALLEL, self.max_trim_parallel
            )));
        }
        if self.encoding.format.is_lossy() && self.encoding.bitrate.trim().is_empty() {
            return Err(PipelineError::config_error("audio bitrate must not be empty"));
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string())
}

fn env_parse<T>(key: &str) -> PipelineResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| PipelineError::config_error(format!("{}={}: {}", key, raw, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sequential_mp3() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_trim_parallel, 1);
        assert_eq!(config.encoding.format, AudioFormat::Mp3);
        assert_eq!(config.encoding.bitrate, "192k");
        assert_eq!(config.identity.source_address.as_deref(), Some("0.0.0.0"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parallelism_bounds() {
        assert!(PipelineConfig::default().with_max_trim_parallel(0).validate().is_err());
        assert!(PipelineConfig::default().with_max_trim_parallel(4).validate().is_ok());
        assert!(PipelineConfig::default()
            .with_max_trim_parallel(MAX_TRIM_PARALLEL + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_env_parse_reports_key() {
        std::env::set_var("MASHUP_TEST_BAD_NUMBER", "four");
        let err = env_parse::<usize>("MASHUP_TEST_BAD_NUMBER").unwrap_err();
        assert!(err.to_string().contains("MASHUP_TEST_BAD_NUMBER=four"));
        std::env::remove_var("MASHUP_TEST_BAD_NUMBER");

        assert_eq!(env_parse::<usize>("MASHUP_TEST_UNSET_NUMBER").unwrap(), None);
    }
}

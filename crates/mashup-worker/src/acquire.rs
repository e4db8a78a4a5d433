//! Acquisition stage: fetch up to N audio items into the working area.

use std::path::Path;
use tracing::{info, warn};

use mashup_media::MediaSource;
use mashup_models::{AudioFormat, AudioItem, Query};

use crate::error::{PipelineError, PipelineResult};
use crate::retry::{retry_async, RetryConfig};

/// Wraps a [`MediaSource`] with retry and the "nothing downloaded" check.
pub struct MediaAcquirer<'a, S> {
    source: &'a S,
    format: AudioFormat,
    retry: RetryConfig,
}

impl<'a, S: MediaSource> MediaAcquirer<'a, S> {
    pub fn new(source: &'a S, format: AudioFormat, retry: RetryConfig) -> Self {
        Self {
            source,
            format,
            retry,
        }
    }

    /// Fetch items for `query` into `dest`, creating it if needed.
    ///
    /// A partial batch is a success. The call fails when the provider
    /// rejects the whole request (after retries) or materializes nothing.
    pub async fn acquire(&self, query: &Query, dest: &Path) -> PipelineResult<Vec<AudioItem>> {
        tokio::fs::create_dir_all(dest).await?;

        let format = self.format;
        let items = retry_async(
            &self.retry,
            || async move {
                self.source
                    .fetch(query, dest, format)
                    .await
                    .map_err(PipelineError::acquisition)
            },
            PipelineError::is_retryable,
        )
        .await
        .map_err(|exhausted| {
            warn!(attempts = exhausted.attempts, "Acquisition gave up");
            exhausted.error
        })?;

        if items.is_empty() {
            return Err(PipelineError::nothing_downloaded(format!(
                "provider returned no audio for \"{}\"",
                query.search_term()
            )));
        }

        let requested = query.count() as usize;
        if items.len() < requested {
            warn!(
                materialized = items.len(),
                requested,
                "Provider delivered a partial batch"
            );
        } else {
            info!(materialized = items.len(), "Provider delivered the full batch");
        }

        metrics::counter!("mashup_items_acquired_total").increment(items.len() as u64);

        Ok(items)
    }
}

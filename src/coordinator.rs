//! Batch coordination
//!
//! One call per incoming request:
//! 1. normalize, dropping invalid entries
//! 2. deduplicate, keeping first occurrence
//! 3. answer cache hits directly
//! 4. submit one extraction per miss to the bounded queue; each task writes a
//!    success through to the cache as it completes
//! 5. wait for all, then return one result per distinct URL, in request order

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::normalizer::{NormalizedUrl, normalize_urls};
use crate::page_extractor::{ExtractionResult, PageExtractor};
use crate::scheduler::{QueueError, TaskQueue};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Extraction task failed: {0}")]
    Task(#[from] QueueError),
}

#[derive(Clone)]
pub struct BatchCoordinator {
    extractor: Arc<PageExtractor>,
    queue: TaskQueue,
    cache: Arc<ResultCache>,
}

impl BatchCoordinator {
    pub fn new(extractor: Arc<PageExtractor>, queue: TaskQueue, cache: Arc<ResultCache>) -> Self {
        Self {
            extractor,
            queue,
            cache,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Extract metadata for a batch of raw URL strings
    ///
    /// Per-URL failures come back as `ExtractionResult::Error` entries. `Err`
    /// is reserved for the queue itself failing (shut down, or a task panicked).
    pub async fn scrape<I, S>(&self, raw_urls: I) -> Result<Vec<ExtractionResult>, CoordinatorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut urls = normalize_urls(raw_urls);
        let mut seen = HashSet::new();
        urls.retain(|url| seen.insert(url.clone()));

        let span = info_span!("scrape_batch", request_id = %Uuid::new_v4(), urls = urls.len());
        self.run_batch(urls).instrument(span).await
    }

    async fn run_batch(
        &self,
        urls: Vec<NormalizedUrl>,
    ) -> Result<Vec<ExtractionResult>, CoordinatorError> {
        let mut slots: Vec<Option<ExtractionResult>> = Vec::with_capacity(urls.len());
        let mut misses = Vec::new();

        for (index, url) in urls.iter().enumerate() {
            match self.cache.get(url) {
                Some(hit) => {
                    debug!(%url, "Cache hit");
                    slots.push(Some(hit));
                }
                None => {
                    slots.push(None);
                    misses.push((index, url.clone()));
                }
            }
        }

        info!(
            hits = urls.len() - misses.len(),
            misses = misses.len(),
            "Dispatching batch"
        );

        let handles: Vec<_> = misses
            .iter()
            .map(|(_, url)| {
                let extractor = Arc::clone(&self.extractor);
                let cache = Arc::clone(&self.cache);
                let url = url.clone();
                // Written from the task so a dropped request still fills the cache
                self.queue.submit(async move {
                    let result = extractor.extract(&url).await;
                    cache.insert(&url, result.clone());
                    result
                })
            })
            .collect();

        let completed = join_all(handles).await;

        let mut failure = None;
        for ((index, _), outcome) in misses.into_iter().zip(completed) {
            match outcome {
                Ok(result) => slots[index] = Some(result),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            return Err(e.into());
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

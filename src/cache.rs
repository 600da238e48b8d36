//! Time-bounded result cache
//!
//! Successful extractions are kept for a fixed TTL, keyed by normalized URL.
//! Errors are never stored, so a transient failure is retried on the next
//! request instead of being remembered.
//!
//! Lookups are O(1), as are inserts while there is room. An insert into a
//! full cache scans every entry: it first drops expired entries and, if that
//! is not enough, evicts the entry closest to expiry.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::normalizer::NormalizedUrl;
use crate::page_extractor::ExtractionResult;
use crate::utils::constants::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL};

struct CacheEntry {
    result: ExtractionResult,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_MAX_ENTRIES)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Unexpired result for `url`, if any
    pub fn get(&self, url: &NormalizedUrl) -> Option<ExtractionResult> {
        let now = Instant::now();
        {
            let entry = self.entries.get(url.as_str())?;
            if !entry.is_expired(now) {
                return Some(entry.result.clone());
            }
        }
        // Re-check under the write lock; a fresh insert may have raced in
        self.entries
            .remove_if(url.as_str(), |_, entry| entry.is_expired(now));
        None
    }

    /// Store a result for one TTL. Only successes are kept; returns whether it was stored.
    pub fn insert(&self, url: &NormalizedUrl, result: ExtractionResult) -> bool {
        if !result.is_success() {
            return false;
        }

        if !self.entries.contains_key(url.as_str()) && self.entries.len() >= self.max_entries {
            self.make_room();
        }

        self.entries.insert(
            url.as_str().to_string(),
            CacheEntry {
                result,
                expires_at: Instant::now() + self.ttl,
            },
        );
        true
    }

    fn make_room(&self) {
        let purged = self.purge_expired();
        if purged > 0 || self.entries.len() < self.max_entries {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!(url = %key, "Cache full, evicting entry closest to expiry");
            self.entries.remove(&key);
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically purge expired entries until `cancel` fires
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, remaining = cache.len(), "Swept expired cache entries");
                        }
                    }
                    _ = cancel.cancelled() => {
                        info!("Cache sweeper cancelled");
                        break;
                    }
                }
            }
        })
    }
}

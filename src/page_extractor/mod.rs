//! Page metadata extraction
//!
//! [`PageExtractor::extract`] turns one normalized URL into an
//! [`ExtractionResult`]. It never returns `Err`: every failure (page
//! creation, policy setup, navigation, timeout, non-2xx status, script
//! evaluation) becomes an `ExtractionResult::Error` so one bad URL cannot
//! abort a batch. The page is closed on every path.

pub mod html;
pub mod js_scripts;
pub mod schema;
pub mod targets;

pub use schema::{ExtractionResult, MetaTag};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::browser::{BrowserError, PagePolicy, RenderPage, RenderSession};
use crate::normalizer::NormalizedUrl;
use crate::utils::constants::DEFAULT_NAVIGATION_TIMEOUT_MS;

/// Why a single extraction failed
#[derive(Debug, thiserror::Error)]
enum PageFailure {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Navigation timeout of {0} ms exceeded")]
    Timeout(u128),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("No response received for navigation")]
    NoResponse,
}

#[derive(Clone)]
pub struct PageExtractor {
    session: Arc<dyn RenderSession>,
    policy: PagePolicy,
    navigation_timeout: Duration,
}

impl PageExtractor {
    pub fn new(session: Arc<dyn RenderSession>) -> Self {
        Self {
            session,
            policy: PagePolicy::default(),
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    pub fn with_policy(mut self, policy: PagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    /// Extract meta tags for one URL
    pub async fn extract(&self, url: &NormalizedUrl) -> ExtractionResult {
        let started = Instant::now();

        let mut page = match self.session.open_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!(%url, "Failed to acquire page: {}", e);
                return ExtractionResult::failure(url.as_str(), e.to_string());
            }
        };

        let outcome = self.load_and_extract(page.as_mut(), url).await;

        if let Err(e) = page.close().await {
            warn!(%url, "Failed to close page: {}", e);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(tags) => {
                info!(%url, tags = tags.len(), elapsed_ms, "Extraction succeeded");
                ExtractionResult::success(url.as_str(), tags)
            }
            Err(e) => {
                warn!(%url, elapsed_ms, "Extraction failed: {}", e);
                ExtractionResult::failure(url.as_str(), e.to_string())
            }
        }
    }

    async fn load_and_extract(
        &self,
        page: &mut dyn RenderPage,
        url: &NormalizedUrl,
    ) -> Result<Vec<MetaTag>, PageFailure> {
        page.apply_policy(&self.policy).await?;

        let navigation = tokio::time::timeout(self.navigation_timeout, page.navigate(url.as_str()))
            .await
            .map_err(|_| PageFailure::Timeout(self.navigation_timeout.as_millis()))??;

        match navigation.status {
            None => return Err(PageFailure::NoResponse),
            Some(status) if !navigation.is_success() => return Err(PageFailure::Status(status)),
            Some(status) => debug!(%url, status, "Navigation complete"),
        }

        Ok(page.extract_meta_tags().await?)
    }
}

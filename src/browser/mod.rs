//! Browser infrastructure for launching Chrome and rendering pages
//!
//! The rest of the crate talks to the browser only through two traits:
//!
//! - [`RenderSession`] hands out fresh, isolated pages. It may be called
//!   concurrently from every scheduler worker without external locking.
//! - [`RenderPage`] is one page exclusively owned by one extraction task. It
//!   must be closed by that task on every exit path.
//!
//! [`crate::BrowserSession`] and [`ChromiumPage`] are the Chromium-backed
//! implementations; tests substitute their own.

mod page;
mod wrapper;

pub use crate::browser_setup::{download_managed_browser, find_browser_executable};
pub use page::ChromiumPage;
pub use wrapper::{BrowserWrapper, launch_browser};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::page_extractor::MetaTag;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser session is not running")]
    NotRunning,

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Failed to apply page policy: {0}")]
    PolicyFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Failed to evaluate extraction script: {0}")]
    EvaluationFailed(String),

    #[error("Failed to close page: {0}")]
    CloseFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Sub-resource classes the page policy can abort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Stylesheet,
    Font,
    Script,
    Media,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Image,
        ResourceKind::Stylesheet,
        ResourceKind::Font,
        ResourceKind::Script,
        ResourceKind::Media,
    ];
}

/// Per-page loading policy applied before navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePolicy {
    /// Sub-resource kinds whose requests are aborted
    pub blocked: Vec<ResourceKind>,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            blocked: ResourceKind::ALL.to_vec(),
            user_agent: crate::utils::constants::CHROME_USER_AGENT.to_string(),
            accept_language: crate::utils::constants::ACCEPT_LANGUAGE.to_string(),
        }
    }
}

/// What the engine reported about a top-level navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// HTTP status of the main document response, if one was observed
    pub status: Option<u16>,
}

impl Navigation {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

/// Source of isolated pages
#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn open_page(&self) -> BrowserResult<Box<dyn RenderPage>>;

    /// Engine version, or `None` when the engine is down or unresponsive
    async fn version(&self) -> Option<String> {
        None
    }
}

/// One isolated page, owned by exactly one task
#[async_trait]
pub trait RenderPage: Send {
    /// Install request interception and identity headers
    async fn apply_policy(&mut self, policy: &PagePolicy) -> BrowserResult<()>;

    /// Navigate and resolve once the markup has been parsed
    async fn navigate(&mut self, url: &str) -> BrowserResult<Navigation>;

    /// Run the meta tag extraction against the loaded document
    async fn extract_meta_tags(&mut self) -> BrowserResult<Vec<MetaTag>>;

    /// Release the page. Consumes the handle so it cannot be reused.
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}

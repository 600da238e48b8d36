//! The process-wide browser session
//!
//! One Chromium process is launched before the server starts accepting
//! requests and shared by every extraction until shutdown.
//!
//! # Locking
//!
//! The wrapper sits behind a `tokio::sync::RwLock`:
//! - `open_page()` takes a read lock, so any number of scheduler workers can
//!   create pages at once. Chrome handles the parallelism itself.
//! - `shutdown()` takes the write lock once, closes the process and leaves
//!   `None` behind. Later `open_page()` calls fail with `NotRunning`.
//!
//! The session is not relaunched when a page fails. A crashed browser turns
//! every subsequent extraction into a per-URL error until the process restarts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::BrowserConfig;
use crate::browser::{
    BrowserError, BrowserResult, BrowserWrapper, ChromiumPage, RenderPage, RenderSession,
    launch_browser,
};

pub struct BrowserSession {
    browser: RwLock<Option<BrowserWrapper>>,
}

impl BrowserSession {
    /// Launch Chromium. Failure here is fatal to startup.
    pub async fn initialize(config: &BrowserConfig) -> Result<Self> {
        let wrapper = launch_browser(config)
            .await
            .context("Failed to initialize browser session")?;

        let version = wrapper
            .browser()
            .version()
            .await
            .map(|v| v.product)
            .unwrap_or_else(|_| "unknown".to_string());
        info!(%version, "Browser session ready");

        Ok(Self {
            browser: RwLock::new(Some(wrapper)),
        })
    }

    /// Close the browser process if running
    ///
    /// Safe to call multiple times (subsequent calls are no-ops). Does not wait
    /// for in-flight extractions; their pages fail and are reported per URL.
    ///
    /// Both `close()` and `wait()` are required: dropping the wrapper only
    /// aborts the handler task and would leave a zombie Chrome process.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.browser.write().await;

        if let Some(mut wrapper) = guard.take() {
            info!("Shutting down browser");

            if let Err(e) = wrapper.browser_mut().close().await {
                warn!("Failed to close browser cleanly: {}", e);
            }

            if let Err(e) = wrapper.browser_mut().wait().await {
                warn!("Failed to wait for browser exit: {}", e);
            }

            wrapper.cleanup_profile_dir();
            drop(wrapper);
        }

        Ok(())
    }
}

#[async_trait]
impl RenderSession for BrowserSession {
    async fn open_page(&self) -> BrowserResult<Box<dyn RenderPage>> {
        let guard = self.browser.read().await;
        let wrapper = guard.as_ref().ok_or(BrowserError::NotRunning)?;

        let page = wrapper
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        drop(guard);

        debug!("Opened isolated page");
        Ok(Box::new(ChromiumPage::new(page)))
    }

    async fn version(&self) -> Option<String> {
        let guard = self.browser.read().await;
        let wrapper = guard.as_ref()?;
        wrapper.browser().version().await.ok().map(|v| v.product)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Only aborts the handler via BrowserWrapper::drop; call shutdown() first
        debug!("BrowserSession dropping");
    }
}

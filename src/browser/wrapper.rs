//! Browser process handle
//!
//! Owns the chromiumoxide `Browser`, its CDP handler task, and the temporary
//! profile directory created for it.

use anyhow::Result;
use chromiumoxide::browser::Browser;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::BrowserConfig;

/// A running Chromium plus everything that must be torn down with it
///
/// The handler task is aborted on drop. The profile directory is only
/// removed by [`cleanup_profile_dir`](Self::cleanup_profile_dir), which must
/// run after the process has exited.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, profile_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            profile_dir: Some(profile_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Remove the profile directory. Call after `Browser::wait()`; Chrome
    /// holds file locks inside it until exit.
    pub fn cleanup_profile_dir(&mut self) {
        let Some(path) = self.profile_dir.take() else {
            return;
        };
        match std::fs::remove_dir_all(&path) {
            Ok(()) => info!(path = %path.display(), "Removed browser profile directory"),
            Err(e) => warn!(
                path = %path.display(),
                "Failed to remove browser profile directory: {}", e
            ),
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        debug!("Aborting browser handler task");
        self.handler.abort();

        if let Some(path) = &self.profile_dir {
            warn!(
                path = %path.display(),
                "Browser dropped without BrowserSession::shutdown(); profile directory left behind"
            );
        }
    }
}

/// Launch the process-wide browser with a per-process profile directory
pub async fn launch_browser(config: &BrowserConfig) -> Result<BrowserWrapper> {
    let profile_dir =
        std::env::temp_dir().join(format!("metatag_scraper_{}", std::process::id()));

    let (browser, handler) =
        crate::browser_setup::launch_browser(config, profile_dir.clone()).await?;

    Ok(BrowserWrapper::new(browser, handler, profile_dir))
}

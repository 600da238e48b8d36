use anyhow::{Context, Result, anyhow};
use chromiumoxide::Handler;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::BrowserConfig;

/// Sandbox/resource profile used to launch Chromium
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchProfile {
    /// `Restricted` inside containers, `Sandboxed` everywhere else
    #[default]
    Auto,
    /// Regular Chrome sandbox
    Sandboxed,
    /// No setuid sandbox, no /dev/shm, no zygote. For containers and PaaS dynos.
    Restricted,
}

impl LaunchProfile {
    /// Collapse `Auto` into a concrete profile for this environment
    pub fn resolve(self) -> LaunchProfile {
        match self {
            LaunchProfile::Auto if is_containerized() => LaunchProfile::Restricted,
            LaunchProfile::Auto => LaunchProfile::Sandboxed,
            concrete => concrete,
        }
    }

    /// Chrome flags for this profile, on top of the shared resource-trimming set
    pub fn args(self) -> Vec<&'static str> {
        let mut args = vec![
            "--disable-gpu",
            "--disable-extensions",
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-backgrounding-occluded-windows",
            "--disable-breakpad",
            "--disable-component-extensions-with-background-pages",
            "--disable-default-apps",
            "--disable-features=TranslateUI",
            "--disable-hang-monitor",
            "--disable-notifications",
            "--disable-popup-blocking",
            "--disable-prompt-on-repost",
            "--disable-sync",
            "--metrics-recording-only",
            "--mute-audio",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--use-mock-keychain",
            "--hide-scrollbars",
        ];
        if self.resolve() == LaunchProfile::Restricted {
            args.extend([
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--no-zygote",
            ]);
        }
        args
    }
}

/// Chrome profile directory that is removed again unless the launch succeeds
struct ProfileDir {
    path: PathBuf,
    launched: bool,
}

impl ProfileDir {
    fn create(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create profile directory {}", path.display()))?;
        Ok(Self {
            path,
            launched: false,
        })
    }

    /// Hand the directory over to the running browser
    fn persist(mut self) -> PathBuf {
        self.launched = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if self.launched {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed profile directory after failed launch"),
            Err(e) => warn!(path = %self.path.display(), "Failed to remove profile directory: {}", e),
        }
    }
}

#[cfg(target_os = "windows")]
const WELL_KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const WELL_KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

const PATH_COMMANDS: [&str; 4] = ["chromium", "chromium-browser", "google-chrome", "chrome"];

/// Where a browser executable was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutableSource {
    Config,
    Env,
    WellKnown,
    SearchPath,
}

fn existing(path: PathBuf, source: ExecutableSource) -> Option<(PathBuf, ExecutableSource)> {
    if path.exists() {
        Some((path, source))
    } else {
        warn!(?source, path = %path.display(), "Browser executable does not exist");
        None
    }
}

fn which(command: &str) -> Option<PathBuf> {
    let output = Command::new("which").arg(command).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!found.is_empty()).then(|| PathBuf::from(found))
}

/// Locate a local Chrome/Chromium
///
/// Lookup order: `explicit`, `$CHROMIUM_PATH`, well-known install locations,
/// then `which` on Unix.
pub async fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    let found = explicit
        .and_then(|path| existing(path.to_path_buf(), ExecutableSource::Config))
        .or_else(|| {
            std::env::var_os("CHROMIUM_PATH")
                .and_then(|path| existing(PathBuf::from(path), ExecutableSource::Env))
        })
        .or_else(|| {
            WELL_KNOWN_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
                .map(|path| (path, ExecutableSource::WellKnown))
        })
        .or_else(|| {
            if cfg!(target_os = "windows") {
                return None;
            }
            PATH_COMMANDS
                .iter()
                .find_map(|command| which(command))
                .map(|path| (path, ExecutableSource::SearchPath))
        });

    match found {
        Some((path, source)) => {
            info!(?source, path = %path.display(), "Found browser executable");
            Ok(path)
        }
        None => Err(anyhow!("Chrome/Chromium executable not found")),
    }
}

/// Download a Chromium build into the user cache directory and return its executable
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| std::env::temp_dir().join(".cache"))
        .join("metatag-scraper")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    info!(dir = %cache_dir.display(), "Downloading managed Chromium");
    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .context("Failed to build fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Failed to download Chromium")?;

    info!(path = %revision.executable_path.display(), "Managed Chromium ready");
    Ok(revision.executable_path)
}

/// chromiumoxide does not model every CDP message Chrome emits; these parse
/// failures are noise (<https://github.com/mattsse/chromiumoxide/issues/167>)
fn is_benign_cdp_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

/// Poll the CDP handler until the connection closes
async fn drive_handler(mut handler: Handler) {
    while let Some(event) = handler.next().await {
        match event {
            Ok(()) => {}
            Err(e) if is_benign_cdp_error(&e.to_string()) => {
                trace!("Ignoring unparsed CDP message: {}", e);
            }
            Err(e) => error!("Browser handler error: {:?}", e),
        }
    }
    info!("Browser handler task completed");
}

/// Launch Chromium with the configured profile and spawn its CDP handler loop
///
/// `user_data_dir` is created here and removed again if the launch fails; on
/// success the caller owns it and must remove it after the browser exits.
pub async fn launch_browser(
    config: &BrowserConfig,
    user_data_dir: PathBuf,
) -> Result<(Browser, JoinHandle<()>)> {
    let executable = match find_browser_executable(config.executable.as_deref()).await {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; falling back to managed download", e);
            download_managed_browser().await?
        }
    };

    let profile_dir = ProfileDir::create(user_data_dir)?;
    let profile = config.profile.resolve();
    info!(?profile, headless = config.headless, "Launching Chromium");

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(config.window.width, config.window.height)
        .user_data_dir(&profile_dir.path)
        .chrome_executable(executable)
        .args(profile.args());
    builder = if config.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let browser_config = builder
        .build()
        .map_err(|e| anyhow!("Invalid browser configuration: {e}"))?;

    let (browser, handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;
    let handler_task = task::spawn(drive_handler(handler));

    profile_dir.persist();
    Ok((browser, handler_task))
}

/// Docker, Podman and Kubernetes all leave one of these behind; setuid
/// sandboxing does not work there
fn is_containerized() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var_os("container").is_some()
        || std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()
}

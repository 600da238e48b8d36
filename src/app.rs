//! Application wiring and lifecycle
//!
//! Startup order: browser, cache and sweeper, task queue, extractor,
//! coordinator, router. Shutdown runs in reverse: stop taking work, give
//! in-flight extractions the configured grace, close the browser, stop the
//! sweeper, then let the HTTP server drain.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::RenderSession;
use crate::cache::ResultCache;
use crate::coordinator::BatchCoordinator;
use crate::http::{self, AppState};
use crate::manager::BrowserSession;
use crate::page_extractor::PageExtractor;
use crate::scheduler::TaskQueue;
use crate::Config;

pub struct App {
    config: Config,
    session: Arc<dyn RenderSession>,
    browser: Option<Arc<BrowserSession>>,
    coordinator: BatchCoordinator,
    sweeper_cancel: CancellationToken,
    server_cancel: CancellationToken,
}

impl App {
    /// Launch the shared browser and wire every component around it
    ///
    /// A browser that fails to launch is fatal; there is no degraded mode.
    pub async fn launch(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let browser = Arc::new(BrowserSession::initialize(&config.browser).await?);
        let session: Arc<dyn RenderSession> = browser.clone();

        let mut app = Self::with_session(config, session)?;
        app.browser = Some(browser);
        Ok(app)
    }

    /// Wire the pipeline around an existing render session
    pub fn with_session(config: Config, session: Arc<dyn RenderSession>) -> Result<Self> {
        let navigation_timeout = config
            .scrape
            .navigation_timeout()
            .context("Invalid navigation timeout")?;

        let cache = Arc::new(ResultCache::new(config.cache.ttl(), config.cache.max_entries));
        let sweeper_cancel = CancellationToken::new();
        cache.spawn_sweeper(config.cache.sweep_interval(), sweeper_cancel.clone());

        let queue = TaskQueue::new(config.scrape.concurrency);
        let extractor = PageExtractor::new(session.clone())
            .with_policy(config.scrape.page_policy())
            .with_navigation_timeout(navigation_timeout);
        let coordinator = BatchCoordinator::new(Arc::new(extractor), queue, cache);

        info!(
            concurrency = config.scrape.concurrency,
            navigation_timeout_ms = navigation_timeout.as_millis() as u64,
            cache_ttl_secs = config.cache.ttl_secs,
            "Extraction pipeline ready"
        );

        Ok(Self {
            config,
            session,
            browser: None,
            coordinator,
            sweeper_cancel,
            server_cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn coordinator(&self) -> &BatchCoordinator {
        &self.coordinator
    }

    pub fn router(&self) -> Result<Router> {
        let state = AppState {
            coordinator: self.coordinator.clone(),
            session: self.session.clone(),
        };
        http::create_router(state, &self.config.server).context("Failed to build HTTP router")
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {addr}"))?;

        let router = self.router()?;
        let server_cancel = self.server_cancel.clone();
        let mut server = tokio::spawn(http::serve(listener, router, server_cancel));

        tokio::select! {
            _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
            _ = wait_for_sigterm() => info!("Received SIGTERM, shutting down"),
            result = &mut server => {
                // Server stopped on its own; still release the browser
                self.shutdown().await;
                return result.context("HTTP server task panicked")?;
            }
        }

        self.shutdown().await;

        let abort = server.abort_handle();
        match tokio::time::timeout(Duration::from_secs(5), server).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => error!("HTTP server task failed: {}", e),
            Err(_) => {
                warn!("HTTP server did not shut down within 5s, aborting");
                abort.abort();
            }
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Stop accepting work and release the browser
    ///
    /// Idempotent. Extractions still running after the grace period fail
    /// individually once the browser is gone.
    pub async fn shutdown(&self) {
        let queue = self.coordinator.queue();
        queue.close();

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        if !grace.is_zero() && !queue.wait_idle(grace).await {
            warn!(
                in_flight = queue.in_flight(),
                "Extractions still running after {}s grace period",
                grace.as_secs()
            );
        }

        if let Some(browser) = &self.browser {
            if let Err(e) = browser.shutdown().await {
                error!("Browser shutdown failed: {}", e);
            }
        }

        self.sweeper_cancel.cancel();
        self.server_cancel.cancel();
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}. Relying on Ctrl+C only.", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}

// Meta tag scraper HTTP server
//
// Launches a shared headless Chromium, then serves the scrape API and the
// static front-end until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use metatag_scraper::{App, load_yaml_config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,metatag_scraper=debug")),
        )
        .with_target(true)
        .init();

    let config = load_yaml_config().context("Failed to load configuration")?;
    info!(
        listen = %config.listen_addr(),
        static_dir = %config.server.static_dir.display(),
        "Starting metatag-scraper v{}",
        env!("CARGO_PKG_VERSION")
    );

    let app = App::launch(config)
        .await
        .context("Failed to start metatag-scraper")?;
    app.run().await
}

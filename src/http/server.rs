//! HTTP listener

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serve `router` on `listener` until `shutdown` is cancelled
///
/// In-flight requests are allowed to finish once shutdown starts.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.cancelled().await;
        info!("HTTP server shutting down");
    })
    .await
    .context("HTTP server error")?;

    Ok(())
}

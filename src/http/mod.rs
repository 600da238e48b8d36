//! HTTP API
//!
//! Axum router for the scrape API plus the static front-end.
//!
//! - `POST /api/scrape` runs one batch through the [`BatchCoordinator`](crate::BatchCoordinator)
//! - `GET /api/test` is a liveness check
//! - `GET /api/health` reports browser, cache and queue state
//! - everything else is served from the static directory

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::serve;

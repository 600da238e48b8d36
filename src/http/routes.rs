//! Route table and middleware stack

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, HeaderValue, Method,
        header::{
            CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL,
            X_FRAME_OPTIONS,
        },
    },
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::utils::ConfigError;
use crate::{RateLimitConfig, ServerConfig};

use super::handlers::{self, AppState};

/// Build the full application router
pub fn create_router(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let mut api = Router::new()
        .route("/scrape", post(handlers::scrape))
        .route("/test", get(handlers::test))
        .route("/health", get(handlers::health));

    // Static assets are not rate limited
    if config.rate_limit.enabled {
        api = with_rate_limit(api, &config.rate_limit)?;
    }

    let index = config.static_dir.join("index.html");
    let static_files = ServeDir::new(&config.static_dir).fallback(ServeFile::new(index));

    let app = Router::new()
        .nest("/api", api)
        .fallback_service(static_files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(security_header(X_CONTENT_TYPE_OPTIONS, "nosniff"))
                .layer(security_header(X_FRAME_OPTIONS, "SAMEORIGIN"))
                .layer(security_header(REFERRER_POLICY, "no-referrer"))
                .layer(security_header(X_DNS_PREFETCH_CONTROL, "off")),
        )
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                field: "server.cors_origins",
                reason: format!("not a valid origin: {origin:?}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

/// Per-peer-IP token bucket: `requests` per `window_secs`, all available as burst
///
/// Keys on the socket peer address, so the server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
fn with_rate_limit(
    api: Router<AppState>,
    config: &RateLimitConfig,
) -> Result<Router<AppState>, ConfigError> {
    let window_ms = config.window_secs.saturating_mul(1000);
    let replenish_ms = (window_ms / u64::from(config.requests.max(1))).max(1);

    let governor = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms)
        .burst_size(config.requests)
        .finish()
        .ok_or_else(|| ConfigError::Invalid {
            field: "server.rate_limit",
            reason: "requests and window_secs must be greater than zero".to_string(),
        })?;

    Ok(api.layer(GovernorLayer {
        config: Arc::new(governor),
    }))
}

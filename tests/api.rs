//! HTTP surface driven through the router with tower's `oneshot`

mod common;

use std::net::SocketAddr;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    response::Response,
};
use common::{FakeSession, PageScript};
use metatag_scraper::{App, Config, MetaTag};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: App,
    session: FakeSession,
    _static_dir: TempDir,
}

impl TestApp {
    fn new(configure: impl FnOnce(&mut Config)) -> Self {
        let static_dir = TempDir::new().unwrap();
        std::fs::write(
            static_dir.path().join("index.html"),
            "<!doctype html><title>Meta Tag Scraper</title>",
        )
        .unwrap();

        let mut config = Config::default();
        config.server.static_dir = static_dir.path().to_path_buf();
        config.server.rate_limit.enabled = false;
        configure(&mut config);

        let session = FakeSession::new();
        let app = App::with_session(config, session.clone().into_session()).unwrap();
        Self {
            app,
            session,
            _static_dir: static_dir,
        }
    }

    fn router(&self) -> Router {
        self.app.router().unwrap()
    }
}

fn scrape_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/scrape")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_endpoint_reports_working() {
    let app = TestApp::new(|_| {});
    let response = app.router().oneshot(get("/api/test")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "API is working" }));
}

#[tokio::test]
async fn scrape_returns_one_entry_per_url() {
    let app = TestApp::new(|_| {});
    app.session.script(
        "https://example.com/",
        PageScript::ok(vec![
            MetaTag::new("title", "Example Domain"),
            MetaTag::new("description", "An example"),
        ]),
    );
    app.session
        .script("https://missing.example/", PageScript::status(404));

    let response = app
        .router()
        .oneshot(scrape_request(
            r#"{"urls": ["https://example.com", "https://missing.example", "nonsense"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!([
            {
                "url": "https://example.com/",
                "status": "success",
                "metaTags": [
                    { "name": "title", "content": "Example Domain" },
                    { "name": "description", "content": "An example" }
                ]
            },
            {
                "url": "https://missing.example/",
                "status": "error",
                "metaTags": [],
                "error": "HTTP error: 404"
            }
        ])
    );
}

#[tokio::test]
async fn empty_url_list_returns_empty_array() {
    let app = TestApp::new(|_| {});
    let response = app
        .router()
        .oneshot(scrape_request(r#"{"urls": []}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
    assert_eq!(app.session.opened(), 0);
}

#[tokio::test]
async fn non_string_entries_are_ignored() {
    let app = TestApp::new(|_| {});
    let response = app
        .router()
        .oneshot(scrape_request(r#"{"urls": [42, null, "https://example.com"]}"#))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["url"], "https://example.com/");
}

#[tokio::test]
async fn missing_or_non_array_urls_is_bad_request() {
    let app = TestApp::new(|_| {});

    for body in [r#"{}"#, r#"{"urls": "https://example.com"}"#, r#"[1, 2]"#] {
        let response = app.router().oneshot(scrape_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(json_body(response).await["error"], "Invalid request");
    }
    assert_eq!(app.session.opened(), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new(|_| {});
    let response = app
        .router()
        .oneshot(scrape_request(r#"{"urls": ["#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid request");
}

#[tokio::test]
async fn shut_down_queue_is_internal_error() {
    let app = TestApp::new(|_| {});
    app.app.shutdown().await;

    let response = app
        .router()
        .oneshot(scrape_request(r#"{"urls": ["https://example.com"]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Internal server error");
}

#[tokio::test]
async fn health_reports_browser_cache_and_queue() {
    let app = TestApp::new(|config| config.scrape.concurrency = 4);
    app.router()
        .oneshot(scrape_request(r#"{"urls": ["https://example.com"]}"#))
        .await
        .unwrap();

    let response = app.router().oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "status": "ok",
            "browser": { "connected": true, "version": "FakeChrome/1.0" },
            "cache": { "entries": 1 },
            "queue": { "inFlight": 0, "queued": 0, "concurrency": 4 }
        })
    );
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = TestApp::new(|_| {});
    let response = app.router().oneshot(get("/api/test")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert_eq!(headers["x-dns-prefetch-control"], "off");
}

#[tokio::test]
async fn cors_allows_configured_origin_only() {
    let app = TestApp::new(|_| {});
    let request = |origin: &str| {
        Request::builder()
            .uri("/api/test")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app
        .router()
        .oneshot(request("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let denied = app
        .router()
        .oneshot(request("https://evil.example"))
        .await
        .unwrap();
    assert!(
        !denied
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

#[tokio::test]
async fn static_front_end_is_served_with_spa_fallback() {
    let app = TestApp::new(|_| {});

    for uri in ["/", "/index.html", "/some/client/route"] {
        let response = app.router().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Meta Tag Scraper"));
    }
}

#[tokio::test]
async fn api_is_rate_limited_per_client() {
    let app = TestApp::new(|config| {
        config.server.rate_limit.enabled = true;
        config.server.rate_limit.requests = 2;
        config.server.rate_limit.window_secs = 900;
    });
    let router = app.router();
    let peer = SocketAddr::from(([203, 0, 113, 7], 40_000));
    let request = || {
        Request::builder()
            .uri("/api/test")
            .extension(ConnectInfo(peer))
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let response = router.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let limited = router.clone().oneshot(request()).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    // Static assets sit outside the limiter
    let response = router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

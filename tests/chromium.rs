//! Real Chromium against a local fixture server
//!
//! These need a Chrome/Chromium install (or network access for the managed
//! download), so they are ignored by default:
//! `cargo test --test chromium -- --ignored`

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};
use metatag_scraper::browser_setup::launch_browser;
use metatag_scraper::page_extractor::js_scripts::META_TAGS_SCRIPT;
use metatag_scraper::{
    BrowserConfig, BrowserSession, MetaTag, NormalizedUrl, PageExtractor, RenderSession,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::net::TcpListener;

const FIXTURE: &str = r#"<!doctype html>
<html><head>
  <meta property="og:title" content="OG">
  <link rel="canonical" href="https://x/y">
  <meta name="description" content="d">
  <title>Example</title>
</head><body><h1>Hi</h1><img src="/pixel.png"></body></html>"#;

fn fixture_tags() -> Vec<MetaTag> {
    vec![
        MetaTag::new("title", "Example"),
        MetaTag::new("description", "d"),
        MetaTag::new("canonical", "https://x/y"),
        MetaTag::new("h1", "Hi"),
        MetaTag::new("og:title", "OG"),
    ]
}

#[derive(Clone, Default)]
struct Hits {
    pixel: Arc<AtomicUsize>,
}

async fn pixel(State(hits): State<Hits>) -> impl IntoResponse {
    hits.pixel.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], Vec::<u8>::new())
}

async fn fixture_server() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/", get(|| async { Html(FIXTURE) }))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Html("<title>Gone</title>")) }),
        )
        .route("/pixel.png", get(pixel))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn url(addr: SocketAddr, path: &str) -> NormalizedUrl {
    NormalizedUrl::parse(&format!("http://{addr}{path}")).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a Chromium install"]
async fn in_page_script_returns_targets_in_fixed_order() {
    let (addr, _) = fixture_server().await;
    let profile = TempDir::new().unwrap();
    let (mut browser, handler) =
        launch_browser(&BrowserConfig::default(), profile.path().join("profile"))
            .await
            .unwrap();

    let page = browser.new_page(url(addr, "/").as_str()).await.unwrap();
    let tags: Vec<MetaTag> = page
        .evaluate(META_TAGS_SCRIPT)
        .await
        .unwrap()
        .into_value()
        .unwrap();

    assert_eq!(tags, fixture_tags());

    page.close().await.unwrap();
    browser.close().await.unwrap();
    browser.wait().await.unwrap();
    handler.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a Chromium install"]
async fn extractor_renders_blocks_and_reports_status() {
    let (addr, hits) = fixture_server().await;
    let session = Arc::new(BrowserSession::initialize(&BrowserConfig::default()).await.unwrap());
    let render: Arc<dyn RenderSession> = session.clone();
    let extractor = PageExtractor::new(render);

    let found = extractor.extract(&url(addr, "/")).await;
    assert!(found.is_success(), "unexpected failure: {:?}", found.error());
    assert_eq!(found.meta_tags(), fixture_tags().as_slice());
    assert_eq!(hits.pixel.load(Ordering::SeqCst), 0, "image request was not aborted");

    let missing = extractor.extract(&url(addr, "/missing")).await;
    assert_eq!(missing.error(), Some("HTTP error: 404"));

    session.shutdown().await.unwrap();
}

//! Scriptable in-memory render session shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metatag_scraper::{
    BrowserError, BrowserResult, MetaTag, Navigation, PagePolicy, RenderPage, RenderSession,
};

/// How a fake page behaves for one URL
#[derive(Debug, Clone)]
pub struct PageScript {
    pub status: Option<u16>,
    pub tags: Vec<MetaTag>,
    pub delay: Duration,
    pub navigate_error: Option<String>,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            status: Some(200),
            tags: vec![MetaTag::new("title", "Example")],
            delay: Duration::from_millis(10),
            navigate_error: None,
        }
    }
}

impl PageScript {
    pub fn ok(tags: Vec<MetaTag>) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            tags: Vec::new(),
            ..Self::default()
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn navigation_error(message: &str) -> Self {
        Self {
            navigate_error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<HashMap<String, PageScript>>,
    fail_open: AtomicBool,
    running: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    navigations: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    navigated: Mutex<Vec<String>>,
    policies: Mutex<Vec<PagePolicy>>,
}

#[derive(Clone)]
pub struct FakeSession {
    shared: Arc<Shared>,
}

impl FakeSession {
    pub fn new() -> Self {
        let shared = Shared::default();
        shared.running.store(true, Ordering::SeqCst);
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn into_session(self) -> Arc<dyn RenderSession> {
        Arc::new(self)
    }

    /// Script the behaviour for one normalized URL; others use the default
    pub fn script(&self, url: &str, script: PageScript) {
        self.shared
            .scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    /// Make every `open_page` call fail
    pub fn fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Simulate the browser going away
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.shared.navigations.load(Ordering::SeqCst)
    }

    /// Highest number of navigations observed in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }

    pub fn navigated(&self) -> Vec<String> {
        self.shared.navigated.lock().unwrap().clone()
    }

    pub fn policies(&self) -> Vec<PagePolicy> {
        self.shared.policies.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn open_page(&self) -> BrowserResult<Box<dyn RenderPage>> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(BrowserError::NotRunning);
        }
        if self.shared.fail_open.load(Ordering::SeqCst) {
            return Err(BrowserError::PageCreationFailed("target crashed".to_string()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            shared: self.shared.clone(),
            script: None,
        }))
    }

    async fn version(&self) -> Option<String> {
        self.shared
            .running
            .load(Ordering::SeqCst)
            .then(|| "FakeChrome/1.0".to_string())
    }
}

struct FakePage {
    shared: Arc<Shared>,
    script: Option<PageScript>,
}

/// Keeps the active-navigation count honest when a navigation is cancelled
struct ActiveNavigation<'a> {
    shared: &'a Shared,
}

impl<'a> ActiveNavigation<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let now = shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        shared.peak.fetch_max(now, Ordering::SeqCst);
        Self { shared }
    }
}

impl Drop for ActiveNavigation<'_> {
    fn drop(&mut self) {
        self.shared.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RenderPage for FakePage {
    async fn apply_policy(&mut self, policy: &PagePolicy) -> BrowserResult<()> {
        self.shared.policies.lock().unwrap().push(policy.clone());
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> BrowserResult<Navigation> {
        self.shared.navigations.fetch_add(1, Ordering::SeqCst);
        self.shared.navigated.lock().unwrap().push(url.to_string());

        let script = self
            .shared
            .scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default();

        {
            let _active = ActiveNavigation::enter(&self.shared);
            tokio::time::sleep(script.delay).await;
        }

        if let Some(message) = &script.navigate_error {
            return Err(BrowserError::NavigationFailed(message.clone()));
        }

        let status = script.status;
        self.script = Some(script);
        Ok(Navigation { status })
    }

    async fn extract_meta_tags(&mut self) -> BrowserResult<Vec<MetaTag>> {
        Ok(self
            .script
            .as_ref()
            .map(|script| script.tags.clone())
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! Chromium-backed [`RenderPage`]
//!
//! chromiumoxide's `Page` has no Drop implementation and needs an explicit
//! async `close()` to release the target. `ChromiumPage` closes on the normal
//! path and falls back to a background close from `Drop` if the owning task
//! was cancelled or panicked before reaching it.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, EventResponseReceived, Headers, ResourceType, SetExtraHttpHeadersParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{BrowserError, BrowserResult, Navigation, PagePolicy, RenderPage, ResourceKind};
use crate::page_extractor::MetaTag;
use crate::page_extractor::html::extract_meta_tags_from_html;
use crate::page_extractor::js_scripts::{META_TAGS_SCRIPT, META_TAGS_SCRIPT_VERSION};

fn resource_type(kind: ResourceKind) -> ResourceType {
    match kind {
        ResourceKind::Image => ResourceType::Image,
        ResourceKind::Stylesheet => ResourceType::Stylesheet,
        ResourceKind::Font => ResourceType::Font,
        ResourceKind::Script => ResourceType::Script,
        ResourceKind::Media => ResourceType::Media,
    }
}

pub struct ChromiumPage {
    page: Option<Page>,
    interceptor: Option<JoinHandle<()>>,
    runtime_handle: tokio::runtime::Handle,
}

impl ChromiumPage {
    pub(crate) fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            interceptor: None,
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }

    fn page(&self) -> BrowserResult<&Page> {
        self.page.as_ref().ok_or(BrowserError::NotRunning)
    }

    async fn install_interception(&mut self, blocked: &[ResourceKind]) -> BrowserResult<()> {
        if blocked.is_empty() {
            return Ok(());
        }
        let page = self.page()?.clone();

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| BrowserError::PolicyFailed(e.to_string()))?;

        let blocked: Vec<ResourceType> = blocked.iter().copied().map(resource_type).collect();
        let patterns: Vec<RequestPattern> = blocked
            .iter()
            .map(|rt| {
                RequestPattern::builder()
                    .url_pattern("*")
                    .resource_type(rt.clone())
                    .request_stage(RequestStage::Request)
                    .build()
            })
            .collect();

        page.execute(fetch::EnableParams::builder().patterns(patterns).build())
            .await
            .map_err(|e| BrowserError::PolicyFailed(e.to_string()))?;

        let interceptor_page = page.clone();
        self.interceptor = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let outcome = if blocked.contains(&event.resource_type) {
                    interceptor_page
                        .execute(FailRequestParams::new(
                            event.request_id.clone(),
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ())
                } else {
                    interceptor_page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    // The page may already be navigating away or closing
                    trace!("Failed to resolve paused request: {}", e);
                }
            }
        }));

        Ok(())
    }
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn apply_policy(&mut self, policy: &PagePolicy) -> BrowserResult<()> {
        self.install_interception(&policy.blocked).await?;

        let page = self.page()?;
        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(policy.user_agent.clone())
            .accept_language(policy.accept_language.clone())
            .build()
            .map_err(BrowserError::PolicyFailed)?;
        page.execute(user_agent)
            .await
            .map_err(|e| BrowserError::PolicyFailed(e.to_string()))?;

        let headers = Headers::new(serde_json::json!({
            "Accept-Language": policy.accept_language,
        }));
        page.execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(|e| BrowserError::PolicyFailed(e.to_string()))?;

        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> BrowserResult<Navigation> {
        let page = self.page()?;

        // Subscribe before navigating so no event can slip past
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        let mut dom_ready = page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        let navigated = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        if let Some(error_text) = navigated.result.error_text.clone() {
            return Err(BrowserError::NavigationFailed(error_text));
        }
        let main_frame = navigated.result.frame_id.clone();

        let mut status = None;
        while let Some(event) = responses.next().await {
            if event.r#type == ResourceType::Document
                && event.frame_id.as_ref() == Some(&main_frame)
            {
                status = u16::try_from(event.response.status).ok();
                break;
            }
        }

        if dom_ready.next().await.is_none() {
            return Err(BrowserError::NavigationFailed(
                "page closed before DOMContentLoaded".to_string(),
            ));
        }

        debug!(url, ?status, "Document parsed");
        Ok(Navigation { status })
    }

    async fn extract_meta_tags(&mut self) -> BrowserResult<Vec<MetaTag>> {
        let page = self.page()?;

        let evaluated = match page.evaluate(META_TAGS_SCRIPT).await {
            Ok(result) => result
                .into_value::<Vec<MetaTag>>()
                .map_err(|e| BrowserError::EvaluationFailed(e.to_string())),
            Err(e) => Err(BrowserError::EvaluationFailed(e.to_string())),
        };

        match evaluated {
            Ok(tags) => Ok(tags),
            Err(eval_error) => {
                warn!(
                    script_version = META_TAGS_SCRIPT_VERSION,
                    "{}; falling back to HTML parsing", eval_error
                );
                let html = page
                    .content()
                    .await
                    .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
                Ok(extract_meta_tags_from_html(&html))
            }
        }
    }

    async fn close(mut self: Box<Self>) -> BrowserResult<()> {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| BrowserError::CloseFailed(e.to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        if let Some(page) = self.page.take() {
            warn!("ChromiumPage dropped without close(); closing in background");
            self.runtime_handle.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!("Background page close failed: {}", e);
                }
            });
        }
    }
}

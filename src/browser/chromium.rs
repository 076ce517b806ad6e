//! Chromium driver using chromiumoxide.

use super::{with_navigation_timeout, BrowserDriver, BrowserPage, BrowserSession, NetworkResponse, ResponseStream};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::page::Page;
use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Upper bound on waiting for a response body to finish loading.
const BODY_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Launches a fresh headless Chromium per session.
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    chrome_path: Option<PathBuf>,
    headless: bool,
}

impl ChromiumDriver {
    pub fn new(config: &Config) -> Self {
        Self { chrome_path: config.chrome_path.clone(), headless: config.headless }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if !self.headless {
            builder = builder.with_head();
        }

        builder.build().map_err(|e| anyhow!("failed to build browser config: {e}"))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config).await.context("failed to launch Chromium")?;

        // The handler drives the CDP connection and must be polled for the whole session
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!("CDP handler error: {e}");
                }
            }
        });

        debug!("Chromium session launched");
        Ok(Box::new(ChromiumSession { browser, handler_task }))
    }
}

/// A running Chromium process.
pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let page = self.browser.new_page("about:blank").await.context("failed to create new page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession { mut browser, handler_task } = *self;

        let closed = browser.close().await.context("failed to close Chromium");
        if let Err(e) = browser.wait().await {
            warn!("Chromium process did not exit cleanly: {e}");
        }
        handler_task.abort();

        debug!("Chromium session closed");
        closed.map(|_| ())
    }
}

/// A Chromium tab.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn subscribe_responses(&self) -> Result<ResponseStream> {
        let responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to network responses")?;
        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("failed to subscribe to loading events")?;
        let failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("failed to subscribe to loading events")?;

        let loads = LoadTracker::default();

        // Body reads block whoever polls the response stream, so loading events
        // need their own consumer.
        let tracker = loads.clone();
        let load_events = tokio::spawn(async move {
            let finished = finished.map(|e| (e.request_id.inner().clone(), LoadState::Finished));
            let failed = failed.map(|e| (e.request_id.inner().clone(), LoadState::Failed));
            let mut events = futures::stream::select(finished, failed).boxed();

            while let Some((request_id, state)) = events.next().await {
                tracker.mark(&request_id, state);
            }
        });

        let page = self.page.clone();
        let responses = responses
            .map(move |event| {
                let request_id = event.request_id.clone();
                let response: Box<dyn NetworkResponse> = Box::new(ChromiumResponse {
                    page: page.clone(),
                    load_state: loads.subscribe(request_id.inner()),
                    request_id,
                    url: event.response.url.clone(),
                    status: u16::try_from(event.response.status).unwrap_or_default(),
                });
                response
            })
            .boxed();

        Ok(TrackedResponses { responses, load_events }.boxed())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("Navigating to {}", url);

        with_navigation_timeout(timeout, async {
            self.page.goto(url).await.context("navigation failed")?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                warn!("Selector {} not found within {} ms", selector, timeout.as_millis());
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn rendered_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        result.into_value().map_err(|e| anyhow!("failed to convert HTML result: {e:?}"))
    }
}

/// Loading progress of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Pending,
    Finished,
    Failed,
}

/// Loading progress of every request seen on a page, keyed by request id.
///
/// State is kept even when the loading event arrives before anyone asks, so
/// a late subscriber still sees it.
#[derive(Debug, Clone, Default)]
struct LoadTracker {
    requests: Arc<Mutex<HashMap<String, watch::Sender<LoadState>>>>,
}

impl LoadTracker {
    fn mark(&self, request_id: &str, state: LoadState) {
        self.with_sender(request_id, |sender| {
            sender.send_replace(state);
        });
    }

    fn subscribe(&self, request_id: &str) -> watch::Receiver<LoadState> {
        self.with_sender(request_id, |sender| sender.subscribe())
    }

    fn with_sender<T>(&self, request_id: &str, f: impl FnOnce(&watch::Sender<LoadState>) -> T) -> T {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = requests
            .entry(request_id.to_string())
            .or_insert_with(|| watch::channel(LoadState::Pending).0);
        f(sender)
    }
}

/// Waits until the request behind `load_state` finished loading.
async fn wait_for_load(mut load_state: watch::Receiver<LoadState>, timeout: Duration) -> Result<()> {
    let outcome = tokio::time::timeout(timeout, load_state.wait_for(|s| *s != LoadState::Pending))
        .await
        .map(|waited| waited.map(|state| *state));

    match outcome {
        Ok(Ok(LoadState::Failed)) => Err(anyhow!("request failed to load")),
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(anyhow!("page went away before the response finished loading")),
        Err(_) => Err(anyhow!("response did not finish loading within {} ms", timeout.as_millis())),
    }
}

/// Response stream that owns the task feeding its loading events.
struct TrackedResponses {
    responses: BoxStream<'static, Box<dyn NetworkResponse>>,
    load_events: JoinHandle<()>,
}

impl Stream for TrackedResponses {
    type Item = Box<dyn NetworkResponse>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.responses.poll_next_unpin(cx)
    }
}

impl Drop for TrackedResponses {
    fn drop(&mut self) {
        self.load_events.abort();
    }
}

/// Response metadata from a `Network.responseReceived` event.
struct ChromiumResponse {
    page: Page,
    request_id: RequestId,
    load_state: watch::Receiver<LoadState>,
    url: String,
    status: u16,
}

#[async_trait]
impl NetworkResponse for ChromiumResponse {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> u16 {
        self.status
    }

    async fn text(&self) -> Result<String> {
        // The body is only served once `Network.loadingFinished` fired for the request
        wait_for_load(self.load_state.clone(), BODY_LOAD_TIMEOUT)
            .await
            .with_context(|| format!("body of {} unavailable", self.url))?;

        let body = self
            .page
            .execute(GetResponseBodyParams::new(self.request_id.clone()))
            .await
            .context("failed to read response body")?
            .result;

        if body.base64_encoded {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(body.body.as_bytes())
                .context("failed to decode response body")?;
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        Ok(body.body)
    }
}

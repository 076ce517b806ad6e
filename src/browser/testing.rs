//! Scriptable in-memory browser for exercising the search pipeline.

use super::{with_navigation_timeout, BrowserDriver, BrowserPage, BrowserSession, NetworkResponse, ResponseStream};
use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const QUOTE_URL: &str = "https://reservations3.fasthotel.com.br/reservaMotorCotar/214";

/// A canned response.
#[derive(Debug, Clone)]
pub(crate) struct StaticResponse {
    pub url: String,
    pub status: u16,
    pub body: Option<String>,
}

impl StaticResponse {
    pub fn new(url: &str, status: u16, body: &str) -> Self {
        Self { url: url.to_string(), status, body: Some(body.to_string()) }
    }

    pub fn quote(status: u16, body: &str) -> Self {
        Self::new(QUOTE_URL, status, body)
    }

    /// A response whose body cannot be read.
    pub fn unreadable(url: &str, status: u16) -> Self {
        Self { url: url.to_string(), status, body: None }
    }
}

#[async_trait]
impl NetworkResponse for StaticResponse {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> u16 {
        self.status
    }

    async fn text(&self) -> Result<String> {
        match &self.body {
            Some(body) => Ok(body.clone()),
            None => bail!("No resource with given identifier found"),
        }
    }
}

/// What the page does at each step of a search.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageScript {
    pub during_navigation: Vec<StaticResponse>,
    pub navigation_delay: Duration,
    pub navigation_error: Option<String>,
    pub during_selector_wait: Vec<StaticResponse>,
    pub selector_delay: Duration,
    pub selector_found: bool,
    pub html: String,
    pub snapshot_error: Option<String>,
    pub launch_error: Option<String>,
}

/// Shared recording of what the pipeline did to the browser.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub launches: AtomicU32,
    pub closes: AtomicU32,
    pub subscriptions_open_at_close: AtomicBool,
    pub steps: Mutex<Vec<String>>,
    pub urls: Mutex<Vec<String>>,
}

impl Recorder {
    fn step(&self, step: &str) {
        self.steps.lock().unwrap().push(step.to_string());
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap().clone()
    }

    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockDriver {
    script: PageScript,
    pub recorder: Arc<Recorder>,
}

impl MockDriver {
    pub fn new(script: PageScript) -> Self {
        Self { script, recorder: Arc::new(Recorder::default()) }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.recorder.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.script.launch_error {
            bail!("{}", message);
        }

        let page = Arc::new(MockPage::new(self.script.clone(), Arc::clone(&self.recorder)));
        Ok(Box::new(MockSession { page, recorder: Arc::clone(&self.recorder) }))
    }
}

struct MockSession {
    page: Arc<MockPage>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        Ok(Box::new(SharedPage(Arc::clone(&self.page))))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let open = self.page.open_subscriptions();
        self.recorder.subscriptions_open_at_close.store(open > 0, Ordering::SeqCst);
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        self.recorder.step("close");
        Ok(())
    }
}

pub(crate) struct MockPage {
    script: PageScript,
    recorder: Arc<Recorder>,
    listeners: Mutex<Vec<UnboundedSender<Box<dyn NetworkResponse>>>>,
}

impl MockPage {
    pub fn new(script: PageScript, recorder: Arc<Recorder>) -> Self {
        Self { script, recorder, listeners: Mutex::new(Vec::new()) }
    }

    /// Delivers a response to every live subscriber.
    pub fn emit(&self, response: StaticResponse) {
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            let _ = listener.unbounded_send(Box::new(response.clone()));
        }
    }

    pub fn open_subscriptions(&self) -> usize {
        self.listeners.lock().unwrap().iter().filter(|l| !l.is_closed()).count()
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn subscribe_responses(&self) -> Result<ResponseStream> {
        self.recorder.step("subscribe");
        let (tx, rx) = mpsc::unbounded();
        self.listeners.lock().unwrap().push(tx);
        Ok(rx.boxed())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.recorder.step("navigate");
        self.recorder.urls.lock().unwrap().push(url.to_string());

        for response in &self.script.during_navigation {
            self.emit(response.clone());
        }

        with_navigation_timeout(timeout, async {
            tokio::time::sleep(self.script.navigation_delay).await;
            match &self.script.navigation_error {
                Some(message) => bail!("{}", message),
                None => Ok(()),
            }
        })
        .await
    }

    async fn wait_for_selector(&self, _selector: &str, timeout: Duration) -> Result<bool> {
        self.recorder.step("wait_for_selector");

        for response in &self.script.during_selector_wait {
            self.emit(response.clone());
        }

        if self.script.selector_found {
            tokio::time::sleep(self.script.selector_delay.min(timeout)).await;
            Ok(true)
        } else {
            tokio::time::sleep(timeout).await;
            Ok(false)
        }
    }

    async fn rendered_html(&self) -> Result<String> {
        self.recorder.step("rendered_html");
        match &self.script.snapshot_error {
            Some(message) => bail!("{}", message),
            None => Ok(self.script.html.clone()),
        }
    }
}

/// Lets the session hand out the same page while tests keep a handle to it.
struct SharedPage(Arc<MockPage>);

#[async_trait]
impl BrowserPage for SharedPage {
    async fn subscribe_responses(&self) -> Result<ResponseStream> {
        self.0.subscribe_responses().await
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.0.navigate(url, timeout).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        self.0.wait_for_selector(selector, timeout).await
    }

    async fn rendered_html(&self) -> Result<String> {
        self.0.rendered_html().await
    }
}

//! Browser driver abstraction.
//!
//! The search core only needs a handful of primitives from a browser: launch a
//! session, open a page, navigate with a bound, wait for a DOM marker, observe
//! network responses and snapshot the rendered HTML. They are expressed as
//! traits so the orchestration can be exercised without Chromium.

pub mod chromium;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::future::Future;
use std::time::Duration;

pub use chromium::ChromiumDriver;

/// A network response observed on a page.
#[async_trait]
pub trait NetworkResponse: Send + Sync {
    /// The response URL.
    fn url(&self) -> &str;
    /// HTTP status code.
    fn status(&self) -> u16;
    /// Reads the response body as text.
    async fn text(&self) -> Result<String>;
}

/// Live feed of responses on a page. Dropping the stream removes the subscription.
pub type ResponseStream = BoxStream<'static, Box<dyn NetworkResponse>>;

/// Launches browsing sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Starts a new, isolated browsing session.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One running browser. Owned by exactly one search.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a blank page.
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;
    /// Shuts the browser down, closing every page it owns.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single page (tab).
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Subscribes to responses received by this page from now on.
    async fn subscribe_responses(&self) -> Result<ResponseStream>;

    /// Navigates to `url`, failing with a navigation timeout after `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Waits for `selector` to appear. Returns `false` on expiry instead of failing.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Returns the current document's outer HTML.
    async fn rendered_html(&self) -> Result<String>;
}

/// Bounds a navigation future, turning expiry into a navigation timeout error.
pub async fn with_navigation_timeout<F, T>(timeout: Duration, navigation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, navigation).await {
        Ok(result) => result,
        Err(_) => bail!("Navigation timeout of {} ms exceeded", timeout.as_millis()),
    }
}

//! Observation of the reservation engine's quote endpoint.
//!
//! The availability page loads its rates from an XHR endpoint. When that call
//! fails the page still renders, just without rooms, so the failure has to be
//! read from the network response itself. The monitor consumes the page's
//! response stream on its own task, concurrently with navigation, and latches
//! the first failing quote response it sees.

use crate::browser::{BrowserPage, NetworkResponse, ResponseStream};
use anyhow::Result;
use futures::StreamExt;
use regex_lite::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Payload keys that may carry a human-readable failure message, in priority order.
const MESSAGE_KEYS: [&str; 3] = ["message", "mensagem", "error"];

/// A business failure reported by the quote endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationErrorSignal {
    pub message: String,
    pub status_code: u16,
    pub payload: Option<Value>,
    pub url: String,
}

impl ReservationErrorSignal {
    /// Inspects a response from the quote endpoint, returning a signal if it failed.
    ///
    /// Failure means an HTTP error status, or a JSON payload whose `status` is
    /// `"error"` or whose `sucesso` flag is `false`. Either indicator is enough.
    pub fn from_response(url: &str, status_code: u16, body: Option<&str>) -> Option<Self> {
        let payload = body.and_then(|b| serde_json::from_str::<Value>(b).ok());

        let status_failed = status_code >= 400;
        let payload_failed = payload.as_ref().is_some_and(payload_indicates_failure);

        if !status_failed && !payload_failed {
            return None;
        }

        let message = payload.as_ref().and_then(payload_message).unwrap_or_else(|| {
            format!("Error in reservaMotorCotar request (status {status_code})")
        });

        Some(Self { message, status_code, payload, url: url.to_string() })
    }
}

fn payload_indicates_failure(payload: &Value) -> bool {
    payload.get("status").and_then(Value::as_str) == Some("error")
        || payload.get("sucesso").and_then(Value::as_bool) == Some(false)
}

fn payload_message(payload: &Value) -> Option<String> {
    MESSAGE_KEYS
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .find(|m| !m.is_empty())
        .map(String::from)
}

/// Compiles an endpoint pattern for case-insensitive URL matching.
pub fn endpoint_pattern(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Factory for monitor handles.
pub struct ResponseMonitor;

impl ResponseMonitor {
    /// Subscribes to `page`'s responses and starts observing them.
    ///
    /// Must be called before navigation so early responses are not missed.
    pub async fn attach(page: &dyn BrowserPage, endpoint: Regex) -> Result<MonitorHandle> {
        let stream = page.subscribe_responses().await?;
        Ok(MonitorHandle::spawn(stream, endpoint))
    }
}

/// A running monitor. Owns the subscription until disposed.
pub struct MonitorHandle {
    latch: Arc<OnceLock<ReservationErrorSignal>>,
    endpoint_seen: watch::Receiver<u32>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    fn spawn(mut stream: ResponseStream, endpoint: Regex) -> Self {
        let latch = Arc::new(OnceLock::new());
        let (seen_tx, seen_rx) = watch::channel(0u32);

        let task_latch = Arc::clone(&latch);
        let task = tokio::spawn(async move {
            while let Some(response) = stream.next().await {
                if task_latch.get().is_some() {
                    continue;
                }
                if !endpoint.is_match(response.url()) {
                    continue;
                }

                if let Some(signal) = inspect(response.as_ref()).await {
                    warn!("Quote endpoint reported failure ({}): {}", signal.status_code, signal.message);
                    // First write wins; later signals are dropped
                    let _ = task_latch.set(signal);
                }
                seen_tx.send_modify(|n| *n += 1);
            }
            trace!("Response stream ended");
        });

        Self { latch, endpoint_seen: seen_rx, task: Some(task) }
    }

    /// Returns the latched failure, if any. Never blocks.
    pub fn current_error(&self) -> Option<ReservationErrorSignal> {
        self.latch.get().cloned()
    }

    /// Resolves once at least one quote endpoint response has been processed.
    ///
    /// Never resolves if none arrives while the monitor is live; callers bound it.
    pub async fn first_endpoint_response(&self) {
        let mut seen = self.endpoint_seen.clone();
        let stopped = seen.wait_for(|n| *n > 0).await.is_err();
        if stopped {
            // Observer stopped without a match
            std::future::pending::<()>().await;
        }
    }

    /// Stops observing and releases the subscription. Safe to call repeatedly.
    pub async fn dispose(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!("Response monitor disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn inspect(response: &dyn NetworkResponse) -> Option<ReservationErrorSignal> {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) if !body.is_empty() => Some(body),
        Ok(_) => None,
        Err(e) => {
            debug!("Could not read quote response body: {}", e);
            None
        }
    };

    ReservationErrorSignal::from_response(response.url(), status, body.as_deref())
}

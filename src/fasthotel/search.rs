//! End-to-end availability search against one reservation engine.

use crate::browser::{BrowserDriver, BrowserSession};
use crate::config::Config;
use crate::error::{AppError, ErrorCode};
use crate::fasthotel::models::AccommodationListing;
use crate::fasthotel::monitor::{endpoint_pattern, MonitorHandle, ReservationErrorSignal, ResponseMonitor};
use crate::fasthotel::parser::{extract_accommodations, ExtractionError};
use crate::validation::SearchRequest;
use anyhow::{Context, Result};
use chrono::Utc;
use regex_lite::Regex;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runs searches, each in its own browser session.
pub struct SearchOrchestrator<D> {
    driver: D,
    config: Config,
    endpoint: Regex,
}

impl<D: BrowserDriver> SearchOrchestrator<D> {
    /// Creates an orchestrator, compiling the quote endpoint pattern from `config`.
    pub fn new(driver: D, config: Config) -> Result<Self> {
        let pattern = config.quote_endpoint_pattern();
        let endpoint =
            endpoint_pattern(&pattern).with_context(|| format!("Invalid quote endpoint pattern: {}", pattern))?;

        Ok(Self { driver, config, endpoint })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Searches availability for a `YYYY-MM-DD` date range.
    pub async fn search(&self, checkin: &str, checkout: &str) -> Result<Vec<AccommodationListing>, AppError> {
        self.search_fields(Some(checkin), Some(checkout)).await
    }

    /// Like [`search`](Self::search), for inputs that may be absent.
    pub async fn search_fields(
        &self,
        checkin: Option<&str>,
        checkout: Option<&str>,
    ) -> Result<Vec<AccommodationListing>, AppError> {
        let today = Utc::now().date_naive();
        let request = SearchRequest::parse(checkin, checkout, today)?;

        info!("Searching for rooms from {} to {} ({} nights)", request.checkin, request.checkout, request.nights());

        let listings = self.run(&request).await.map_err(AppError::from_uncaught)?;

        info!("Found {} accommodations", listings.len());
        Ok(listings)
    }

    /// Owns the session: whatever happens inside, the monitor is disposed and
    /// then the browser is closed.
    async fn run(&self, request: &SearchRequest) -> Result<Vec<AccommodationListing>> {
        let session = self.driver.launch().await.context("Failed to launch browser")?;

        let mut monitor = None;
        let outcome = self.run_in_session(session.as_ref(), request, &mut monitor).await;

        if let Some(monitor) = monitor.as_mut() {
            monitor.dispose().await;
        }
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {:#}", e);
        }

        outcome
    }

    async fn run_in_session(
        &self,
        session: &dyn BrowserSession,
        request: &SearchRequest,
        monitor_slot: &mut Option<MonitorHandle>,
    ) -> Result<Vec<AccommodationListing>> {
        let page = session.new_page().await.context("Failed to open page")?;

        let monitor = monitor_slot.insert(ResponseMonitor::attach(page.as_ref(), self.endpoint.clone()).await?);
        let response_deadline = Instant::now() + self.config.response_wait();

        let url = self.config.search_url(request);
        page.navigate(&url, self.config.navigation_timeout()).await?;

        if tokio::time::timeout_at(response_deadline, monitor.first_endpoint_response()).await.is_err() {
            debug!("No quote response within {} ms", self.config.response_wait_ms);
        }
        checkpoint(monitor, "navigation")?;

        let rendered = page
            .wait_for_selector(&self.config.listings_selector, self.config.selector_timeout())
            .await?;
        if !rendered {
            warn!("Listings marker not found within {} ms, continuing", self.config.selector_timeout_ms);
        }
        checkpoint(monitor, "listings wait")?;

        let html = page.rendered_html().await.context("Failed to read rendered page")?;
        debug!("Rendered page is {} bytes", html.len());

        extract_accommodations(&html).map_err(|e| processing_error(e).into())
    }
}

/// Fails the search if the monitor has latched a quote failure.
fn checkpoint(monitor: &MonitorHandle, stage: &str) -> Result<(), AppError> {
    match monitor.current_error() {
        Some(signal) => {
            debug!("Quote failure detected after {}", stage);
            Err(reservation_error(signal))
        }
        None => {
            debug!("No quote failure after {}", stage);
            Ok(())
        }
    }
}

fn reservation_error(signal: ReservationErrorSignal) -> AppError {
    let status = if signal.status_code >= 400 {
        signal.status_code
    } else {
        ErrorCode::ReservationApiError.default_status()
    };
    let details = serde_json::to_value(&signal).unwrap_or_default();

    AppError::new(ErrorCode::ReservationApiError, signal.message).with_status(status).with_details(details)
}

fn processing_error(err: ExtractionError) -> AppError {
    let details = json!({
        "error": err.to_string(),
        "blocksParsed": err.blocks_parsed(),
        "offset": err.offset(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    AppError::new(ErrorCode::DataProcessingError, err.to_string())
        .with_details(details)
        .with_cause(err.into())
}

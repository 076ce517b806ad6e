//! Search command implementation.

use crate::browser::{BrowserDriver, ChromiumDriver};
use crate::config::Config;
use crate::error::AppError;
use crate::fasthotel::SearchOrchestrator;
use crate::format::Formatter;
use anyhow::Result;
use tracing::info;

/// Executes an availability search.
pub struct SearchCommand {
    config: Config,
}

/// Rendered command output. A classified failure is still rendered, but flagged.
#[derive(Debug)]
pub struct SearchOutput {
    pub text: String,
    pub failed: bool,
}

impl SearchCommand {
    /// Creates a new search command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the search against Chromium and returns formatted output.
    pub async fn execute(&self, checkin: &str, checkout: &str) -> Result<SearchOutput> {
        let driver = ChromiumDriver::new(&self.config);
        self.execute_with_driver(driver, checkin, checkout).await
    }

    /// Executes the search with a provided driver (for testing).
    pub async fn execute_with_driver(
        &self,
        driver: impl BrowserDriver,
        checkin: &str,
        checkout: &str,
    ) -> Result<SearchOutput> {
        let orchestrator = SearchOrchestrator::new(driver, self.config.clone())?;
        let formatter = Formatter::new(self.config.format);

        match orchestrator.search(checkin, checkout).await {
            Ok(listings) => {
                Ok(SearchOutput { text: formatter.format_listings(&listings), failed: false })
            }
            Err(err) => {
                log_failure(&err);
                Ok(SearchOutput { text: formatter.format_error(&err), failed: true })
            }
        }
    }
}

fn log_failure(err: &AppError) {
    match &err.cause {
        Some(cause) => info!("Search failed with {}: {:#}", err.code, cause),
        None => info!("Search failed with {}", err.code),
    }
}

//! Error taxonomy shared by every search component.
//!
//! Internally the crate propagates `anyhow::Error` with context. At the search
//! boundary every failure is classified exactly once into an [`AppError`];
//! the CLI and HTTP adapters only render it.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The search request was rejected before any browser work.
    ValidationError,
    /// The reservation engine's quote endpoint reported a business failure.
    ReservationApiError,
    /// The target site did not finish loading within the navigation bound.
    NavigationTimeout,
    /// The rendered document could not be scanned.
    DataProcessingError,
    /// Anything not covered above.
    SearchServiceError,
}

impl ErrorCode {
    /// Returns the status code used when none is given explicitly.
    pub fn default_status(self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::ReservationApiError => 502,
            ErrorCode::NavigationTimeout => 504,
            ErrorCode::DataProcessingError => 502,
            ErrorCode::SearchServiceError => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ReservationApiError => "RESERVATION_API_ERROR",
            ErrorCode::NavigationTimeout => "NAVIGATION_TIMEOUT",
            ErrorCode::DataProcessingError => "DATA_PROCESSING_ERROR",
            ErrorCode::SearchServiceError => "SEARCH_SERVICE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal representation of every failure leaving the search core.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    pub details: Option<Value>,
    #[source]
    pub cause: Option<anyhow::Error>,
}

/// Serializable error payload: `{ error, message, details? }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    /// Creates an error with the code's default status and no details.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, status: code.default_status(), message: message.into(), details: None, cause: None }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Classifies an error that escaped the search pipeline.
    ///
    /// `AppError`s pass through untouched. Anything whose error chain mentions a
    /// timeout is a navigation timeout; everything else is an unclassified
    /// service error that keeps the original as its cause.
    pub fn from_uncaught(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AppError>() {
            Ok(app) => return app,
            Err(err) => err,
        };

        let message = err.to_string();

        if mentions_timeout(&err) {
            return AppError::new(
                ErrorCode::NavigationTimeout,
                "The website took too long to respond. Please try again later.",
            )
            .with_details(json!({ "message": format!("{err:#}") }));
        }

        AppError::new(ErrorCode::SearchServiceError, "Unexpected error while searching for rooms")
            .with_details(json!({ "message": message }))
            .with_cause(err)
    }

    /// Returns the wire body for this error.
    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.code, message: self.message.clone(), details: self.details.clone() }
    }
}

fn mentions_timeout(err: &anyhow::Error) -> bool {
    if err.chain().any(|cause| cause.is::<tokio::time::error::Elapsed>()) {
        return true;
    }

    err.chain().any(|cause| {
        let text = cause.to_string().to_lowercase();
        text.contains("timeout") || text.contains("timed out")
    })
}

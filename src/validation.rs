//! Search request validation.

use crate::error::{AppError, ErrorCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A validated date range. Consumed by a single search and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
}

/// A single field-scoped validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted field path (`checkin`, `checkout`).
    pub path: String,
    pub message: String,
    /// Machine code: `required`, `invalid_string` or `custom`.
    pub code: String,
}

impl ValidationIssue {
    fn new(path: &str, message: impl Into<String>, code: &str) -> Self {
        Self { path: path.to_string(), message: message.into(), code: code.to_string() }
    }
}

/// All issues found in one request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

fn join_messages(issues: &[ValidationIssue]) -> String {
    issues.iter().map(|i| i.message.as_str()).collect::<Vec<_>>().join("; ")
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors.0).unwrap_or_default();
        AppError::new(ErrorCode::ValidationError, "Request validation failed").with_details(details)
    }
}

impl SearchRequest {
    /// Validates raw `YYYY-MM-DD` inputs against `today` (a UTC calendar date).
    ///
    /// Every field is checked so the caller gets the full list of issues, not
    /// just the first one.
    pub fn parse(
        checkin: Option<&str>,
        checkout: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, ValidationErrors> {
        let mut issues = Vec::new();

        let checkin = parse_date_field("checkin", "Checkin", checkin, today, &mut issues);
        let checkout = parse_date_field("checkout", "Checkout", checkout, today, &mut issues);

        if let (Some(checkin), Some(checkout)) = (checkin, checkout) {
            if checkout <= checkin {
                issues.push(ValidationIssue::new(
                    "checkout",
                    "Checkout date must be after checkin date",
                    "custom",
                ));
            }
        }

        match (checkin, checkout) {
            (Some(checkin), Some(checkout)) if issues.is_empty() => Ok(Self { checkin, checkout }),
            _ => Err(ValidationErrors(issues)),
        }
    }

    /// Number of nights covered by the stay.
    pub fn nights(&self) -> i64 {
        (self.checkout - self.checkin).num_days()
    }
}

fn parse_date_field(
    path: &str,
    label: &str,
    raw: Option<&str>,
    today: NaiveDate,
    issues: &mut Vec<ValidationIssue>,
) -> Option<NaiveDate> {
    let Some(raw) = raw else {
        issues.push(ValidationIssue::new(path, format!("{label} date is required"), "required"));
        return None;
    };

    if !is_iso_date_shape(raw) {
        issues.push(ValidationIssue::new(
            path,
            format!("{label} must follow the format YYYY-MM-DD"),
            "invalid_string",
        ));
        return None;
    }

    let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
        issues.push(ValidationIssue::new(path, format!("{label} is not a valid date"), "custom"));
        return None;
    };

    if date < today {
        issues.push(ValidationIssue::new(path, format!("{label} cannot be in the past"), "custom"));
    }

    Some(date)
}

/// Matches `\d{4}-\d{2}-\d{2}`.
fn is_iso_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn paths(err: &ValidationErrors) -> Vec<&str> {
        err.0.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn test_valid_range() {
        let req = SearchRequest::parse(Some("2026-10-19"), Some("2026-10-22"), today()).unwrap();
        assert_eq!(req.checkin, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(req.nights(), 3);
    }

    #[test]
    fn test_checkout_equal_to_checkin() {
        let err = SearchRequest::parse(Some("2026-11-01"), Some("2026-11-01"), today()).unwrap_err();
        assert_eq!(err.0.len(), 1);
        assert_eq!(err.0[0].path, "checkout");
        assert_eq!(err.0[0].message, "Checkout date must be after checkin date");
    }

    #[test]
    fn test_checkout_before_checkin() {
        let err = SearchRequest::parse(Some("2026-11-05"), Some("2026-11-01"), today()).unwrap_err();
        assert_eq!(paths(&err), vec!["checkout"]);
        assert_eq!(err.0[0].code, "custom");
    }

    #[test]
    fn test_dates_in_the_past() {
        let err = SearchRequest::parse(Some("2026-10-18"), Some("2026-10-20"), today()).unwrap_err();
        assert_eq!(paths(&err), vec!["checkin"]);
        assert_eq!(err.0[0].message, "Checkin cannot be in the past");

        let err = SearchRequest::parse(Some("2026-10-10"), Some("2026-10-12"), today()).unwrap_err();
        assert_eq!(paths(&err), vec!["checkin", "checkout"]);
        assert_eq!(err.0[1].message, "Checkout cannot be in the past");
    }

    #[test]
    fn test_bad_format() {
        let err = SearchRequest::parse(Some("19/10/2026"), Some("2026-1-22"), today()).unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert!(err.0.iter().all(|i| i.code == "invalid_string"));
        assert_eq!(err.0[0].message, "Checkin must follow the format YYYY-MM-DD");
    }

    #[test]
    fn test_impossible_calendar_date() {
        let err = SearchRequest::parse(Some("2027-02-30"), Some("2027-03-02"), today()).unwrap_err();
        assert_eq!(err.0[0].message, "Checkin is not a valid date");
    }

    #[test]
    fn test_missing_fields() {
        let err = SearchRequest::parse(None, None, today()).unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert_eq!(err.0[0].message, "Checkin date is required");
        assert_eq!(err.0[1].code, "required");
    }

    #[test]
    fn test_errors_display_every_message() {
        let err = SearchRequest::parse(None, Some("2026-10-01"), today()).unwrap_err();

        assert_eq!(err.to_string(), "Checkin date is required; Checkout cannot be in the past");
        let as_error: &dyn std::error::Error = &err;
        assert!(as_error.source().is_none());
    }

    #[test]
    fn test_into_app_error() {
        let err = SearchRequest::parse(Some("2026-11-01"), Some("2026-11-01"), today()).unwrap_err();
        let app: AppError = err.into();

        assert_eq!(app.code, ErrorCode::ValidationError);
        assert_eq!(app.status, 400);
        let details = app.details.unwrap();
        assert_eq!(details[0]["path"], "checkout");
        assert_eq!(details[0]["code"], "custom");
    }
}

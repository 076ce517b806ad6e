//! fasthotel-search - Room availability search for FastHotel reservation engines
//!
//! A headless-browser search pipeline: the availability page is loaded in
//! Chromium while its quote requests are monitored, then the rendered listings
//! are extracted into plain records.

pub mod browser;
pub mod commands;
pub mod config;
pub mod error;
pub mod fasthotel;
pub mod format;
pub mod server;
pub mod validation;

pub use config::Config;
pub use error::{AppError, ErrorCode};
pub use fasthotel::{extract_accommodations, AccommodationListing, SearchOrchestrator};
pub use validation::SearchRequest;

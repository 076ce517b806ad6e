//! FastHotel reservation engine: response monitoring, orchestration, extraction and models.

pub mod models;
pub mod monitor;
pub mod parser;
pub mod search;
pub mod selectors;

pub use models::{AccommodationListing, TariffEntry, TariffKind};
pub use monitor::{MonitorHandle, ReservationErrorSignal, ResponseMonitor};
pub use parser::{extract_accommodations, ExtractionError};
pub use search::SearchOrchestrator;

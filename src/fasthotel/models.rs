//! Data models for accommodations and their tariffs.

use serde::{Deserialize, Serialize};

pub const NAME_PLACEHOLDER: &str = "Name not found";
pub const DESCRIPTION_PLACEHOLDER: &str = "Description not found";
pub const PRICE_PLACEHOLDER: &str = "Price not available";
pub const IMAGE_PLACEHOLDER: &str = "";

/// A room type offered for the requested stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccommodationListing {
    /// Room title
    pub name: String,
    /// Plain-text description
    pub description: String,
    /// Price exactly as the site formats it (e.g. `R$ 450,00`)
    pub price: String,
    /// Image URL, empty when the block has none
    pub image: String,
}

/// Tariff families the reservation engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TariffKind {
    /// Room-only rate ("Hospedagem").
    Lodging,
    /// Bundled or seasonal rate ("Pacote", "Natal", "Reveillon").
    Package,
    Unclassified,
}

impl TariffKind {
    /// Classifies a tariff label by case-insensitive substring match.
    pub fn classify(label: &str) -> Self {
        let label = label.to_lowercase();

        if label.contains("hospedagem") {
            TariffKind::Lodging
        } else if ["pacote", "natal", "reveillon"].iter().any(|k| label.contains(k)) {
            TariffKind::Package
        } else {
            TariffKind::Unclassified
        }
    }
}

/// One tariff row inside an accommodation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TariffEntry {
    pub kind: TariffKind,
    pub raw_value: String,
}

impl TariffEntry {
    pub fn new(label: &str, raw_value: impl Into<String>) -> Self {
        Self { kind: TariffKind::classify(label), raw_value: raw_value.into() }
    }
}

/// Tariff values collected for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TariffPrices {
    pub lodging: Option<String>,
    pub package: Option<String>,
}

impl TariffPrices {
    /// Folds tariffs in document order. A later value of the same kind replaces an
    /// earlier one; empty values and unclassified tariffs are ignored.
    pub fn collect<I>(tariffs: I) -> Self
    where
        I: IntoIterator<Item = TariffEntry>,
    {
        let mut prices = Self::default();

        for tariff in tariffs {
            if tariff.raw_value.is_empty() {
                continue;
            }
            match tariff.kind {
                TariffKind::Lodging => prices.lodging = Some(tariff.raw_value),
                TariffKind::Package => prices.package = Some(tariff.raw_value),
                TariffKind::Unclassified => {}
            }
        }

        prices
    }

    /// Lodging over package over placeholder.
    pub fn resolve(&self) -> String {
        self.lodging
            .as_ref()
            .or(self.package.as_ref())
            .cloned()
            .unwrap_or_else(|| PRICE_PLACEHOLDER.to_string())
    }
}

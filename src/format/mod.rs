//! Output formatting for accommodation listings (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::error::AppError;
use crate::fasthotel::AccommodationListing;

/// Formats listings for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a search result.
    pub fn format_listings(&self, listings: &[AccommodationListing]) -> String {
        if listings.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No accommodations available for these dates.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_listings(listings),
            OutputFormat::Table => self.table_listings(listings),
            OutputFormat::Markdown => self.markdown_listings(listings),
            OutputFormat::Csv => self.csv_listings(listings),
        }
    }

    /// Formats a classified search failure.
    pub fn format_error(&self, error: &AppError) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&error.body())
                .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", error.code)),
            _ => format!("{} ({}): {}", error.code, error.status, error.message),
        }
    }

    // JSON formatting

    fn json_listings(&self, listings: &[AccommodationListing]) -> String {
        serde_json::to_string_pretty(listings).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_listings(&self, listings: &[AccommodationListing]) -> String {
        let name_width = 30;
        let price_width = 16;
        let description_width = 60;

        let mut lines = Vec::new();

        lines.push(format!("{:<name_width$}  {:<price_width$}  {}", "Name", "Price", "Description"));
        lines.push(format!("{:-<name_width$}  {:-<price_width$}  {:-<description_width$}", "", "", ""));

        for listing in listings {
            lines.push(format!(
                "{:<name_width$}  {:>price_width$}  {}",
                truncate(&listing.name, name_width),
                listing.price,
                truncate(&listing.description, description_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} accommodations", listings.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_listings(&self, listings: &[AccommodationListing]) -> String {
        let mut lines = Vec::new();

        lines.push("| Name | Price | Description | Image |".to_string());
        lines.push("|------|-------|-------------|-------|".to_string());

        for listing in listings {
            let image = if listing.image.is_empty() {
                String::new()
            } else {
                format!("[photo]({})", listing.image)
            };

            lines.push(format!(
                "| {} | {} | {} | {} |",
                listing.name.replace('|', "\\|"),
                listing.price,
                truncate(&listing.description, 60).replace('|', "\\|"),
                image
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} accommodations found*", listings.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "name,description,price,image".to_string()
    }

    fn csv_listings(&self, listings: &[AccommodationListing]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for listing in listings {
            lines.push(format!(
                "{},{},{},{}",
                Self::csv_escape(&listing.name),
                Self::csv_escape(&listing.description),
                Self::csv_escape(&listing.price),
                Self::csv_escape(&listing.image)
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

/// Cuts `text` to at most `width` characters, marking the cut with `...`.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

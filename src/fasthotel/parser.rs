//! Extraction of accommodation listings from the rendered availability page.
//!
//! The pipeline runs in four stages: locate the listings section, cut it into
//! per-room blocks, read each block's fields and tariffs, then resolve the
//! displayed price. Missing pieces inside a block are replaced by placeholders;
//! only a structurally broken block marker aborts extraction.

use crate::fasthotel::models::{
    AccommodationListing, TariffEntry, TariffPrices, DESCRIPTION_PLACEHOLDER, IMAGE_PLACEHOLDER,
    NAME_PLACEHOLDER,
};
use crate::fasthotel::selectors::{block, markers};
use scraper::{ElementRef, Html};
use tracing::{debug, trace};

/// The document could not be segmented.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("accommodation block marker at offset {offset} is never terminated")]
    UnterminatedBlock {
        /// Byte offset of the marker inside the listings section.
        offset: usize,
        /// Blocks segmented before the failure.
        blocks_parsed: usize,
    },
}

impl ExtractionError {
    pub fn offset(&self) -> usize {
        match self {
            ExtractionError::UnterminatedBlock { offset, .. } => *offset,
        }
    }

    pub fn blocks_parsed(&self) -> usize {
        match self {
            ExtractionError::UnterminatedBlock { blocks_parsed, .. } => *blocks_parsed,
        }
    }
}

/// A contiguous slice of the section belonging to one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Room code from `data-codigo`.
    pub code: &'a str,
    /// From the block's opening tag up to the next block or the section end.
    pub html: &'a str,
}

/// Extracts every accommodation in document order.
///
/// A page without the listings section means no availability and yields an
/// empty list.
pub fn extract_accommodations(html: &str) -> Result<Vec<AccommodationListing>, ExtractionError> {
    let Some(section) = locate_section(html) else {
        debug!("Listings section not found, treating as no availability");
        return Ok(Vec::new());
    };

    let blocks = segment_blocks(section)?;
    let listings: Vec<_> = blocks
        .iter()
        .map(|b| {
            let listing = parse_block(b.html);
            trace!("Parsed room {}: {} ({})", b.code, listing.name, listing.price);
            listing
        })
        .collect();

    debug!("Extracted {} accommodations", listings.len());
    Ok(listings)
}

/// Returns the inner HTML of the listings section, if present.
pub fn locate_section(html: &str) -> Option<&str> {
    markers::SECTION.captures(html).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Splits a section into non-overlapping blocks, preserving order.
///
/// Text that merely looks like a block opening (e.g. a non-numeric room code)
/// is not a boundary and stays inside the preceding block. A block opening tag
/// that never closes means the document was cut short and is an error.
pub fn segment_blocks(section: &str) -> Result<Vec<Block<'_>>, ExtractionError> {
    let mut starts: Vec<(usize, &str)> = Vec::new();

    for (offset, _) in section.match_indices(markers::BLOCK_PREFIX) {
        match markers::BLOCK.captures_at(section, offset) {
            Some(caps) if caps.get(0).is_some_and(|m| m.start() == offset) => {
                let code = caps.get(1).map_or("", |m| m.as_str());
                starts.push((offset, code));
            }
            _ if !section[offset..].contains('>') => {
                return Err(ExtractionError::UnterminatedBlock { offset, blocks_parsed: starts.len() });
            }
            _ => trace!("Ignoring malformed block marker at offset {}", offset),
        }
    }

    let blocks = starts
        .iter()
        .enumerate()
        .map(|(i, &(start, code))| {
            let end = starts.get(i + 1).map_or(section.len(), |&(next, _)| next);
            Block { code, html: &section[start..end] }
        })
        .collect();

    Ok(blocks)
}

/// Reads one block's fields, substituting placeholders for anything missing.
pub fn parse_block(block_html: &str) -> AccommodationListing {
    let fragment = Html::parse_fragment(block_html);
    let root = fragment.root_element();

    let name = root
        .select(&block::TITLE)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NAME_PLACEHOLDER.to_string());

    let description = root
        .select(&block::DESCRIPTION)
        .next()
        .map(|e| normalize_text(&e.text().collect::<String>()))
        .unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string());

    let image = root
        .select(&block::IMAGE)
        .next()
        .and_then(|e| e.value().attr("src"))
        .map(String::from)
        .unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string());

    let price = TariffPrices::collect(parse_tariffs(root)).resolve();

    AccommodationListing { name, description, price, image }
}

/// Collects every tariff row in the block, classified by label.
pub fn parse_tariffs(element: ElementRef) -> Vec<TariffEntry> {
    element
        .select(&block::TARIFF)
        .map(|tariff| {
            let label = tariff
                .select(&block::TARIFF_NAME)
                .next()
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default();
            let value = tariff
                .select(&block::TARIFF_VALUE)
                .next()
                .map(|e| e.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            TariffEntry::new(&label, value)
        })
        .collect()
}

/// Turns non-breaking spaces into spaces and collapses whitespace runs.
fn normalize_text(text: &str) -> String {
    text.replace('\u{a0}', " ").replace("&nbsp;", " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

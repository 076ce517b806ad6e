//! Markers and CSS selectors for the FastHotel availability page.
//!
//! The page is not versioned. Section and block boundaries are found by text
//! scanning so a half-rendered or unbalanced document still segments the same
//! way; fields inside a block are read with CSS selectors.
//!
//! **Update process**: when extraction comes back empty or full of placeholders,
//! capture the rendered HTML, adjust the markers below and add a fixture.

use regex_lite::Regex;
use scraper::Selector;
use std::sync::LazyLock;

/// Structural markers used for segmentation.
pub mod markers {
    use super::*;

    /// The listings container. Only the first `</section>` after it closes it.
    pub static SECTION: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?s)<section[^>]*data-name="acomodacoes"[^>]*>(.*?)</section>"#).unwrap()
    });

    /// Opening tag of one accommodation block, capturing its room code.
    pub static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<div class="row borda-cor" data-codigo="(\d+)"[^>]*>"#).unwrap()
    });

    /// Literal prefix of a block opening tag.
    pub const BLOCK_PREFIX: &str = r#"<div class="row borda-cor" data-codigo=""#;
}

/// Selectors for fields inside an accommodation block.
pub mod block {
    use super::*;

    /// Room title.
    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h3[data-campo='titulo']").unwrap());

    /// Free-text description.
    pub static DESCRIPTION: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.quarto.descricao").unwrap());

    /// First image with a source.
    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());

    /// Tariff row.
    pub static TARIFF: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.row.tarifa").unwrap());

    /// Tariff label, inside a tariff row.
    pub static TARIFF_NAME: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h4[data-campo='nome']").unwrap());

    /// Tariff value, inside a tariff row.
    pub static TARIFF_VALUE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("b[data-campo='valor']").unwrap());
}

//! HTML extraction for listing and detail pages
//!
//! This module handles parsing HTML content to extract:
//! - Detail links from a listing page
//! - One record from a detail page

use crate::config::ExtractorConfig;
use crate::record::Record;
use crate::url::resolve_link;
use crate::{ConfigError, ExtractionError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Turns fetched pages into links and records
pub trait PageExtractor: Send + Sync {
    /// Absolute detail URLs on a listing page, in document order
    ///
    /// An empty vector means the partition has no more pages.
    fn extract_links(&self, content: &str, base_url: &Url) -> Vec<String>;

    /// Builds a record from a detail page
    fn extract_record(&self, content: &str, url: &str) -> Result<Record, ExtractionError>;
}

/// CSS-selector based extractor
///
/// # Link Extraction Rules
///
/// For every element matching the listing-item selector, the first
/// `<a href>` inside it is resolved against the listing URL. Items without
/// a usable link are skipped.
///
/// # Record Extraction Rules
///
/// Title, price, address and publication date are required; the first
/// match of each selector is used, with surrounding whitespace trimmed.
/// Area is optional and falls back to the configured sentinel.
#[derive(Debug)]
pub struct SelectorExtractor {
    listing_item: Selector,
    anchor: Selector,
    title: Selector,
    price: Selector,
    address: Selector,
    area: Selector,
    published: Selector,
    area_fallback: String,
}

impl SelectorExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listing_item: parse_selector("listing-item", &config.listing_item)?,
            anchor: parse_selector("anchor", "a[href]")?,
            title: parse_selector("title", &config.title)?,
            price: parse_selector("price", &config.price)?,
            address: parse_selector("address", &config.address)?,
            area: parse_selector("area", &config.area)?,
            published: parse_selector("published", &config.published)?,
            area_fallback: config.area_fallback.clone(),
        })
    }
}

impl PageExtractor for SelectorExtractor {
    fn extract_links(&self, content: &str, base_url: &Url) -> Vec<String> {
        let document = Html::parse_document(content);

        document
            .select(&self.listing_item)
            .filter_map(|item| item.select(&self.anchor).next())
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| resolve_link(href, base_url))
            .collect()
    }

    fn extract_record(&self, content: &str, url: &str) -> Result<Record, ExtractionError> {
        let document = Html::parse_document(content);

        let required = |selector: &Selector, field: &'static str| {
            first_text(&document, selector).ok_or(ExtractionError::MissingField { field })
        };

        let title = required(&self.title, "title")?;
        let price = required(&self.price, "price")?;
        let address = required(&self.address, "address")?;
        let area =
            first_text(&document, &self.area).unwrap_or_else(|| self.area_fallback.clone());
        let published = required(&self.published, "published")?;

        Ok(Record {
            title,
            price,
            address,
            area,
            published,
            url: url.to_string(),
        })
    }
}

/// Parses a selector, naming the config field on failure
pub fn parse_selector(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

//! Listing URL templates
//!
//! A template is a URL with two placeholders, one for the partition and one
//! for the 1-based page number, e.g.
//! `https://www.avito.ru/{partition}/kvartiry/prodam?p={page}`.

use crate::{UrlError, UrlResult};
use url::Url;

pub const PARTITION_PLACEHOLDER: &str = "{partition}";
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// A validated listing URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTemplate {
    raw: String,
}

impl ListingTemplate {
    /// Checks that both placeholders are present
    pub fn parse(raw: &str) -> UrlResult<Self> {
        if !raw.contains(PARTITION_PLACEHOLDER) {
            return Err(UrlError::MissingPlaceholder(PARTITION_PLACEHOLDER));
        }
        if !raw.contains(PAGE_PLACEHOLDER) {
            return Err(UrlError::MissingPlaceholder(PAGE_PLACEHOLDER));
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// Renders the listing URL for one page of one partition
    ///
    /// The rendered string must parse as an absolute http(s) URL.
    pub fn render(&self, partition: &str, page: u32) -> UrlResult<Url> {
        let rendered = self
            .raw
            .replace(PARTITION_PLACEHOLDER, partition)
            .replace(PAGE_PLACEHOLDER, &page.to_string());

        let url = Url::parse(&rendered).map_err(|e| UrlError::Parse(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

//! URL handling module for Listing-Sweep
//!
//! This module builds listing-page URLs from the configured template and
//! resolves the hrefs found on listing pages into absolute detail URLs.

mod template;

pub use template::{ListingTemplate, PAGE_PLACEHOLDER, PARTITION_PLACEHOLDER};

use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.example.com/krym/flats?p=2").unwrap()
    }

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(
            resolve_link("/krym/flats/item_1", &base_url()),
            Some("https://www.example.com/krym/flats/item_1".to_string())
        );
    }

    #[test]
    fn test_resolve_full_url_unchanged() {
        assert_eq!(
            resolve_link("https://other.example.com/item", &base_url()),
            Some("https://other.example.com/item".to_string())
        );
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(
            resolve_link("  /item_2 ", &base_url()),
            Some("https://www.example.com/item_2".to_string())
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        assert_eq!(resolve_link("javascript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("mailto:a@example.com", &base_url()), None);
        assert_eq!(resolve_link("tel:+7000", &base_url()), None);
        assert_eq!(resolve_link("data:text/html,hi", &base_url()), None);
    }

    #[test]
    fn test_skip_fragment_and_empty() {
        assert_eq!(resolve_link("#top", &base_url()), None);
        assert_eq!(resolve_link("   ", &base_url()), None);
    }

    #[test]
    fn test_skip_non_http_after_resolution() {
        assert_eq!(resolve_link("ftp://example.com/file", &base_url()), None);
    }
}

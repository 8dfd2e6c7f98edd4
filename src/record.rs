//! The record type emitted for every accepted listing

/// One listing extracted from a detail page
///
/// Every field is kept as the text shown on the page; no numeric parsing
/// is attempted for price or area.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub title: String,
    pub price: String,
    pub address: String,
    /// Falls back to the configured sentinel when the page has no area line
    pub area: String,
    /// Publication date text as displayed on the page
    pub published: String,
    pub url: String,
}

impl Record {
    /// Returns the (title, address) identity used for deduplication
    pub fn identity(&self) -> (String, String) {
        (self.title.clone(), self.address.clone())
    }
}

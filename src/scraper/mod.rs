//! Marketplace crawling: the rate-limited page fetcher, per-marketplace
//! URL building and HTML extraction, and duplicate aggregation.

pub mod aggregate;
pub mod fetcher;
pub mod mercadolibre;

use crate::domain::listing::RawListing;
use crate::domain::types::{MarketplaceId, QueryText};

/// Pluggable per-marketplace behaviour: building search URLs and turning
/// one result page into raw listing records.
pub trait Marketplace: Send + Sync {
    /// Identifier of the marketplace row listings are attached to.
    fn marketplace_id(&self) -> MarketplaceId;

    /// Number of items one search-result page covers; page N starts at
    /// offset `N * page_size`.
    fn page_size(&self) -> u32;

    /// The search-result URL for a query at the given pagination offset.
    fn search_url(&self, query: &QueryText, offset: u32) -> String;

    /// Parse one search-result page. Malformed entries are skipped; an
    /// empty page yields an empty list, never an error.
    fn extract(&self, html: &str, query: &QueryText, page_offset: u32) -> Vec<RawListing>;
}

/// The fetch seam of the pipeline. A `None` result means the page was
/// permanently lost after the retry budget; callers drop it and move on.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

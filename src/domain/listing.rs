use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::types::{
    ExternalId, ImageUrl, ListingId, ListingTitle, ListingUrl, MarketplaceId, PriceValue,
    QueryText,
};

/// Separator used to join the query texts that produced an aggregated
/// listing into one reversible tag field. Chosen so it cannot collide with
/// a legal (trimmed, non-empty) query text.
pub const QUERY_SEPARATOR: &str = "-QUERYSEP-";

/// One entry extracted from a single search-result page, before
/// deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub external_id: ExternalId,
    pub title: ListingTitle,
    pub price: PriceValue,
    pub url: ListingUrl,
    pub img_url: ImageUrl,
    /// The query text whose result page produced this entry.
    pub query: QueryText,
    /// Pagination offset of the page this entry was extracted from.
    pub page_offset: u32,
}

/// One record per distinct marketplace item after merging paginated and
/// multi-query results.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedListing {
    pub external_id: ExternalId,
    pub title: ListingTitle,
    pub price: PriceValue,
    pub url: ListingUrl,
    pub img_url: ImageUrl,
    /// Contributing query texts joined with [`QUERY_SEPARATOR`], each text
    /// exactly once.
    pub query_tags: String,
}

impl AggregatedListing {
    /// Split the combined tag field back into the contributing query texts.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.query_tags.split(QUERY_SEPARATOR)
    }
}

/// A persisted marketplace page for an item, unique per
/// `(marketplace_id, external_id)` and reused across crawl cycles.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: ListingId,
    pub marketplace_id: MarketplaceId,
    pub external_id: ExternalId,
    pub title: ListingTitle,
    pub url: ListingUrl,
    pub img_url: Option<ImageUrl>,
    pub last_seen: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

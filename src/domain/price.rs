use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::types::{ListingId, PriceId, PriceValue};

/// One append-only price observation for a listing. Price rows are never
/// updated or deleted; together they form the per-listing time series.
#[derive(Debug, Clone, Serialize)]
pub struct Price {
    pub id: PriceId,
    pub listing_id: ListingId,
    pub price: PriceValue,
    pub scraped_at: NaiveDateTime,
}

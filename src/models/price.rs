use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::price::Price as DomainPrice;
use crate::domain::types::{ListingId, PriceId, PriceValue, TypeConstraintError};

/// Diesel representation of a price observation row.
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::prices)]
pub struct Price {
    pub id: i32,
    pub listing_id: i32,
    pub price: f64,
    pub scraped_at: NaiveDateTime,
}

/// Insertable form of [`Price`]. Price rows are append-only.
#[derive(Insertable)]
#[diesel(table_name = crate::schema::prices)]
pub struct NewPrice {
    pub listing_id: i32,
    pub price: f64,
    pub scraped_at: NaiveDateTime,
}

impl TryFrom<Price> for DomainPrice {
    type Error = TypeConstraintError;

    fn try_from(price: Price) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PriceId::new(price.id)?,
            listing_id: ListingId::new(price.listing_id)?,
            price: PriceValue::new(price.price)?,
            scraped_at: price.scraped_at,
        })
    }
}

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::listing::Listing as DomainListing;
use crate::domain::types::{
    ExternalId, ImageUrl, ListingId, ListingTitle, ListingUrl, MarketplaceId, TypeConstraintError,
};

/// Diesel representation of a listing row.
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::listings)]
pub struct Listing {
    pub id: i32,
    pub marketplace_id: i32,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub img_url: Option<String>,
    pub last_seen: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Insertable form of [`Listing`] used for creating new rows.
#[derive(Insertable)]
#[diesel(table_name = crate::schema::listings)]
pub struct NewListing<'a> {
    pub marketplace_id: i32,
    pub external_id: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub img_url: Option<&'a str>,
    pub last_seen: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl TryFrom<Listing> for DomainListing {
    type Error = TypeConstraintError;

    fn try_from(listing: Listing) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ListingId::new(listing.id)?,
            marketplace_id: MarketplaceId::new(listing.marketplace_id)?,
            external_id: ExternalId::new(listing.external_id)?,
            title: ListingTitle::new(listing.title)?,
            url: ListingUrl::new(listing.url)?,
            img_url: listing.img_url.map(ImageUrl::new).transpose()?,
            last_seen: listing.last_seen,
            created_at: listing.created_at,
        })
    }
}

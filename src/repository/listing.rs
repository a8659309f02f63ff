use diesel::prelude::*;

use crate::domain::listing::Listing;
use crate::domain::types::{ExternalId, MarketplaceId};
use crate::models::listing::Listing as DbListing;
use crate::repository::{DieselRepository, ListingReader, RepositoryResult};

impl ListingReader for DieselRepository {
    fn get_listing_by_external_id(
        &self,
        marketplace_id: MarketplaceId,
        external_id: &ExternalId,
    ) -> RepositoryResult<Option<Listing>> {
        use crate::schema::listings;

        let mut conn = self.conn()?;

        let listing = listings::table
            .filter(listings::marketplace_id.eq(marketplace_id.get()))
            .filter(listings::external_id.eq(external_id.as_str()))
            .first::<DbListing>(&mut conn)
            .optional()?;

        listing.map(TryInto::try_into).transpose().map_err(Into::into)
    }
}

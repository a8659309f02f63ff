use diesel::prelude::*;

use crate::domain::price::Price;
use crate::domain::types::ListingId;
use crate::models::price::Price as DbPrice;
use crate::repository::{DieselRepository, PriceReader, RepositoryResult};

impl PriceReader for DieselRepository {
    fn listing_prices(&self, listing_id: ListingId) -> RepositoryResult<Vec<Price>> {
        use crate::schema::prices;

        let mut conn = self.conn()?;

        let rows = prices::table
            .filter(prices::listing_id.eq(listing_id.get()))
            .order(prices::scraped_at.asc())
            .load::<DbPrice>(&mut conn)?;

        rows.into_iter()
            .map(|row| row.try_into().map_err(Into::into))
            .collect()
    }
}

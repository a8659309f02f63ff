use diesel::prelude::*;

use crate::domain::candidate::Candidate;
use crate::domain::types::ListingId;
use crate::models::candidate::Candidate as DbCandidate;
use crate::repository::{CandidateReader, DieselRepository, RepositoryResult};

impl CandidateReader for DieselRepository {
    fn listing_candidates(&self, listing_id: ListingId) -> RepositoryResult<Vec<Candidate>> {
        use crate::schema::product_candidates;

        let mut conn = self.conn()?;

        let rows = product_candidates::table
            .filter(product_candidates::listing_id.eq(listing_id.get()))
            .order(product_candidates::id.asc())
            .load::<DbCandidate>(&mut conn)?;

        rows.into_iter()
            .map(|row| row.try_into().map_err(Into::into))
            .collect()
    }
}

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::candidate::Candidate as DomainCandidate;
use crate::domain::types::{
    CandidateId, ListingId, MatchMethod, ProductId, QueryId, SimilarityDistance,
    TypeConstraintError,
};

/// Diesel representation of a resolution candidate row.
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::product_candidates)]
pub struct Candidate {
    pub id: i32,
    pub query_id: i32,
    pub product_id: i32,
    pub listing_id: i32,
    pub match_method: String,
    pub distance: f32,
    pub decided: bool,
    pub decided_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Insertable form of [`Candidate`] used for creating new rows.
#[derive(Insertable)]
#[diesel(table_name = crate::schema::product_candidates)]
pub struct NewCandidate<'a> {
    pub query_id: i32,
    pub product_id: i32,
    pub listing_id: i32,
    pub match_method: &'a str,
    pub distance: f32,
    pub decided: bool,
    pub created_at: NaiveDateTime,
}

impl TryFrom<Candidate> for DomainCandidate {
    type Error = TypeConstraintError;

    fn try_from(candidate: Candidate) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CandidateId::new(candidate.id)?,
            query_id: QueryId::new(candidate.query_id)?,
            product_id: ProductId::new(candidate.product_id)?,
            listing_id: ListingId::new(candidate.listing_id)?,
            match_method: MatchMethod::try_from(candidate.match_method)?,
            distance: SimilarityDistance::new(candidate.distance)?,
            decided: candidate.decided,
            decided_at: candidate.decided_at,
            created_at: candidate.created_at,
        })
    }
}

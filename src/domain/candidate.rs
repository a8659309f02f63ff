use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::types::{
    CandidateId, ListingId, MatchMethod, ProductId, QueryId, SimilarityDistance,
};

/// Audit record of a resolution decision linking a query, a product and a
/// listing. Created once per (query, listing) discovery event and never
/// deleted; `decided`/`decided_at` are reserved for manual confirmation by
/// an external reviewer.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub query_id: QueryId,
    pub product_id: ProductId,
    pub listing_id: ListingId,
    pub match_method: MatchMethod,
    pub distance: SimilarityDistance,
    pub decided: bool,
    pub decided_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

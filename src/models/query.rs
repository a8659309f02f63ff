use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::query::Query as DomainQuery;
use crate::domain::types::{QueryId, QueryText, TypeConstraintError};

/// Diesel representation of a search query row.
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::queries)]
pub struct Query {
    pub id: i32,
    pub query_text: String,
    pub created_at: NaiveDateTime,
    pub removed_at: Option<NaiveDateTime>,
}

impl TryFrom<Query> for DomainQuery {
    type Error = TypeConstraintError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        Ok(Self {
            id: QueryId::new(query.id)?,
            text: QueryText::new(query.query_text)?,
            created_at: query.created_at,
            removed_at: query.removed_at,
        })
    }
}

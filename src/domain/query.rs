use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::types::{PageCount, QueryId, QueryText};

/// A canonical search query tracked for one or more clients.
///
/// The text is unique and immutable once created; removal is soft via
/// `removed_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    pub id: QueryId,
    pub text: QueryText,
    pub created_at: NaiveDateTime,
    pub removed_at: Option<NaiveDateTime>,
}

/// One distinct unit of crawl work derived from the active subscriptions:
/// a query text together with the maximum page depth requested across all
/// of its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub text: QueryText,
    pub pages: PageCount,
}

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Diesel representation of a queued crawl job. The payload is the JSON
/// serialization of [`crate::domain::job::CrawlJob`].
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::crawl_jobs)]
pub struct CrawlJob {
    pub id: i32,
    pub payload: String,
    pub status: String,
    pub receive_count: i32,
    pub visible_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insertable form of [`CrawlJob`] used when enqueueing work.
#[derive(Insertable)]
#[diesel(table_name = crate::schema::crawl_jobs)]
pub struct NewCrawlJob<'a> {
    pub payload: &'a str,
    pub status: &'a str,
    pub receive_count: i32,
    pub visible_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

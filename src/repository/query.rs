use std::collections::HashMap;

use diesel::prelude::*;

use crate::domain::query::{CrawlRequest, Query};
use crate::domain::types::{PageCount, QueryText};
use crate::models::query::Query as DbQuery;
use crate::repository::{DieselRepository, QueryReader, RepositoryResult};

impl QueryReader for DieselRepository {
    fn queries_by_text(&self, texts: &[&str]) -> RepositoryResult<HashMap<String, Query>> {
        use crate::schema::queries;

        let mut conn = self.conn()?;

        let rows = queries::table
            .filter(queries::query_text.eq_any(texts))
            .filter(queries::removed_at.is_null())
            .load::<DbQuery>(&mut conn)?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let query: Query = row.try_into()?;
            map.insert(query.text.as_str().to_string(), query);
        }
        Ok(map)
    }

    fn list_crawl_requests(&self) -> RepositoryResult<Vec<CrawlRequest>> {
        use crate::schema::{queries, subscriptions};

        let mut conn = self.conn()?;

        let rows: Vec<(String, i32)> = subscriptions::table
            .inner_join(queries::table)
            .filter(subscriptions::removed_at.is_null())
            .filter(queries::removed_at.is_null())
            .select((queries::query_text, subscriptions::pages_to_scrape))
            .load(&mut conn)?;

        // One unit of work per distinct text, at the deepest requested
        // crawl depth.
        let mut depth_by_text: HashMap<String, i32> = HashMap::new();
        for (text, pages) in rows {
            let entry = depth_by_text.entry(text).or_insert(pages);
            if pages > *entry {
                *entry = pages;
            }
        }

        let mut requests = Vec::with_capacity(depth_by_text.len());
        for (text, pages) in depth_by_text {
            requests.push(CrawlRequest {
                text: QueryText::new(text)?,
                pages: PageCount::new(pages.max(1))?,
            });
        }
        requests.sort_by(|a, b| a.text.cmp(&b.text));
        Ok(requests)
    }
}

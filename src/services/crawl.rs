//! The crawl stage for one query: concurrent page fetches, extraction and
//! aggregation.

use std::sync::Arc;

use log::error;
use tokio::task::JoinSet;

use crate::domain::job::CrawlJob;
use crate::domain::listing::AggregatedListing;
use crate::scraper::aggregate::aggregate;
use crate::scraper::{Marketplace, PageFetcher};

/// Fetch every requested result page for a query, extract its listings and
/// merge the duplicates.
///
/// Page fetches run as independent tasks and are consumed in completion
/// order; the aggregation step sorts them, so the output does not depend on
/// which page happened to finish first. Pages lost to the fetcher's retry
/// budget are simply absent from the result.
pub async fn crawl_query<M, F>(
    marketplace: &Arc<M>,
    fetcher: &Arc<F>,
    job: &CrawlJob,
) -> Vec<AggregatedListing>
where
    M: Marketplace + 'static,
    F: PageFetcher + 'static,
{
    let mut tasks = JoinSet::new();

    let pages = u32::try_from(job.pages_to_scrape.get()).unwrap_or(1);
    for page in 0..pages {
        let offset = page * marketplace.page_size();
        let url = marketplace.search_url(&job.query, offset);
        let marketplace = Arc::clone(marketplace);
        let fetcher = Arc::clone(fetcher);
        let query = job.query.clone();

        tasks.spawn(async move {
            let html = fetcher.fetch(&url).await?;
            Some(marketplace.extract(&html, &query, offset))
        });
    }

    let mut raw = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Some(listings)) => raw.extend(listings),
            // Dropped page; the fetcher already logged it.
            Ok(None) => {}
            Err(err) => error!("page fetch task failed: {err}"),
        }
    }

    aggregate(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::listing::RawListing;
    use crate::domain::types::{
        ExternalId, ImageUrl, ListingTitle, ListingUrl, MarketplaceId, PageCount, PriceValue,
        QueryText,
    };

    struct FakeMarketplace;

    impl Marketplace for FakeMarketplace {
        fn marketplace_id(&self) -> MarketplaceId {
            MarketplaceId::new(1).unwrap()
        }

        fn page_size(&self) -> u32 {
            50
        }

        fn search_url(&self, query: &QueryText, offset: u32) -> String {
            format!("https://marketplace.test/{query}/{offset}")
        }

        fn extract(&self, html: &str, query: &QueryText, page_offset: u32) -> Vec<RawListing> {
            // One listing per page, identified by the offset baked into the
            // canned body.
            vec![RawListing {
                external_id: ExternalId::new(format!("EXT-{html}")).unwrap(),
                title: ListingTitle::new(format!("Item {html}")).unwrap(),
                price: PriceValue::new(10.0).unwrap(),
                url: ListingUrl::new("https://marketplace.test/item").unwrap(),
                img_url: ImageUrl::new("https://marketplace.test/item.webp").unwrap(),
                query: query.clone(),
                page_offset,
            }]
        }
    }

    struct FakeFetcher {
        lost_offset: Option<u32>,
    }

    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Option<String> {
            let offset: u32 = url.rsplit('/').next()?.parse().ok()?;
            if self.lost_offset == Some(offset) {
                return None;
            }
            Some(offset.to_string())
        }
    }

    fn job(pages: i32) -> CrawlJob {
        CrawlJob {
            query: QueryText::new("laptop").unwrap(),
            pages_to_scrape: PageCount::new(pages).unwrap(),
        }
    }

    #[tokio::test]
    async fn crawls_every_requested_page() {
        let marketplace = Arc::new(FakeMarketplace);
        let fetcher = Arc::new(FakeFetcher { lost_offset: None });

        let listings = crawl_query(&marketplace, &fetcher, &job(3)).await;

        assert_eq!(listings.len(), 3);
        let ids: Vec<&str> = listings.iter().map(|l| l.external_id.as_str()).collect();
        assert_eq!(ids, vec!["EXT-0", "EXT-50", "EXT-100"]);
    }

    #[tokio::test]
    async fn lost_pages_shrink_but_never_fail_the_crawl() {
        let marketplace = Arc::new(FakeMarketplace);
        let fetcher = Arc::new(FakeFetcher {
            lost_offset: Some(50),
        });

        let listings = crawl_query(&marketplace, &fetcher, &job(3)).await;

        assert_eq!(listings.len(), 2);
        assert!(listings.iter().all(|l| l.external_id != "EXT-50"));
    }
}

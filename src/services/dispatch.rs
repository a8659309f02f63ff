//! Fan-out dispatch: turns the active query subscriptions into crawl jobs,
//! one per distinct query text at the deepest requested page count.

use std::sync::Arc;

use log::{error, info};

use crate::domain::job::CrawlJob;
use crate::domain::types::JobId;
use crate::embedding::TitleEmbedder;
use crate::repository::{CrawlUnitWriter, JobQueue, QueryReader};
use crate::scraper::{Marketplace, PageFetcher};
use crate::services::errors::{ServiceError, ServiceResult};
use crate::services::worker::process_job;

fn crawl_jobs<R: QueryReader>(repo: &R) -> ServiceResult<Vec<CrawlJob>> {
    match repo.list_crawl_requests() {
        Ok(requests) => Ok(requests
            .into_iter()
            .map(|request| CrawlJob {
                query: request.text,
                pages_to_scrape: request.pages,
            })
            .collect()),
        Err(e) => {
            error!("failed to list crawl requests: {e}");
            Err(ServiceError::Internal)
        }
    }
}

/// Publish one queued job per distinct subscribed query text.
pub fn dispatch_jobs<R>(repo: &R) -> ServiceResult<Vec<JobId>>
where
    R: QueryReader + JobQueue,
{
    let jobs = crawl_jobs(repo)?;
    let mut ids = Vec::with_capacity(jobs.len());

    for job in &jobs {
        match repo.enqueue_job(job) {
            Ok(id) => {
                info!(
                    "enqueued job {id} for query '{}' ({} pages)",
                    job.query, job.pages_to_scrape
                );
                ids.push(id);
            }
            Err(e) => {
                error!("failed to enqueue job for query '{}': {e}", job.query);
                return Err(ServiceError::Internal);
            }
        }
    }

    Ok(ids)
}

/// Run the pipeline in-process for every distinct subscribed query text,
/// with the same semantics as the queued path. Failures of one query are
/// logged and do not stop the remaining queries.
pub async fn dispatch_inline<R, M, F, E>(
    repo: &R,
    marketplace: &Arc<M>,
    fetcher: &Arc<F>,
    embedder: &E,
) -> ServiceResult<usize>
where
    R: QueryReader + CrawlUnitWriter,
    M: Marketplace + 'static,
    F: PageFetcher + 'static,
    E: TitleEmbedder,
{
    let jobs = crawl_jobs(repo)?;
    let mut processed = 0;

    for job in &jobs {
        match process_job(repo, marketplace, fetcher, embedder, job).await {
            Ok(summary) => {
                info!(
                    "query '{}': {} new products, {} new listings, {} candidates, {} prices",
                    job.query,
                    summary.new_products,
                    summary.new_listings,
                    summary.candidates_created,
                    summary.prices_appended
                );
                processed += 1;
            }
            Err(e) => error!("inline crawl failed for query '{}': {e}", job.query),
        }
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::CrawlRequest;
    use crate::domain::types::{PageCount, QueryText};
    use crate::repository::test::TestRepository;

    fn request(text: &str, pages: i32) -> CrawlRequest {
        CrawlRequest {
            text: QueryText::new(text).unwrap(),
            pages: PageCount::new(pages).unwrap(),
        }
    }

    #[test]
    fn enqueues_one_job_per_crawl_request() {
        let repo = TestRepository::new(
            Vec::new(),
            vec![request("laptop", 2), request("monitor", 1)],
        );

        let ids = dispatch_jobs(&repo).unwrap();

        assert_eq!(ids.len(), 2);
        let jobs = repo.enqueued_jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].query, "laptop");
        assert_eq!(jobs[0].pages_to_scrape, 2);
        assert_eq!(jobs[1].query, "monitor");
        assert_eq!(jobs[1].pages_to_scrape, 1);
    }

    #[test]
    fn no_subscriptions_means_no_jobs() {
        let repo = TestRepository::default();
        assert!(dispatch_jobs(&repo).unwrap().is_empty());
    }
}

//! Queue consumption: drives the full pipeline for one crawl job at a time.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use crate::domain::job::CrawlJob;
use crate::embedding::TitleEmbedder;
use crate::repository::{CrawlSummary, CrawlUnit, CrawlUnitWriter, JobQueue};
use crate::scraper::{Marketplace, PageFetcher};
use crate::services::crawl::crawl_query;
use crate::services::errors::{ServiceError, ServiceResult};

/// Run the full pipeline for one crawl job: fetch and extract every page,
/// aggregate, embed the titles and persist the unit transactionally.
pub async fn process_job<R, M, F, E>(
    repo: &R,
    marketplace: &Arc<M>,
    fetcher: &Arc<F>,
    embedder: &E,
    job: &CrawlJob,
) -> ServiceResult<CrawlSummary>
where
    R: CrawlUnitWriter,
    M: Marketplace + 'static,
    F: PageFetcher + 'static,
    E: TitleEmbedder,
{
    let listings = crawl_query(marketplace, fetcher, job).await;
    if listings.is_empty() {
        info!("query '{}' produced no listings", job.query);
        return Ok(CrawlSummary::default());
    }

    let mut embeddings = Vec::with_capacity(listings.len());
    for listing in &listings {
        match embedder.embed(listing.title.as_str()) {
            Ok(vector) => embeddings.push(vector),
            Err(e) => {
                error!("failed to embed title '{}': {e}", listing.title);
                return Err(ServiceError::Embedding);
            }
        }
    }

    let unit = CrawlUnit {
        marketplace_id: marketplace.marketplace_id(),
        listings,
        embeddings,
    };
    match repo.persist_crawl(&unit) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!("failed to persist crawl for query '{}': {e}", job.query);
            Err(ServiceError::Internal)
        }
    }
}

/// Receive and process at most one job. Successful jobs are acked; failed
/// ones are released back to the queue for redelivery. Returns whether a
/// job was available.
pub async fn poll_once<R, M, F, E>(
    repo: &R,
    marketplace: &Arc<M>,
    fetcher: &Arc<F>,
    embedder: &E,
) -> ServiceResult<bool>
where
    R: JobQueue + CrawlUnitWriter,
    M: Marketplace + 'static,
    F: PageFetcher + 'static,
    E: TitleEmbedder,
{
    let received = match repo.receive_job() {
        Ok(Some(received)) => received,
        Ok(None) => return Ok(false),
        Err(e) => {
            error!("failed to receive job: {e}");
            return Err(ServiceError::Internal);
        }
    };

    info!(
        "processing job {} (delivery {}) for query '{}'",
        received.id, received.receive_count, received.job.query
    );

    match process_job(repo, marketplace, fetcher, embedder, &received.job).await {
        Ok(summary) => {
            info!(
                "job {} done: {} new products, {} new listings, {} candidates, {} prices",
                received.id,
                summary.new_products,
                summary.new_listings,
                summary.candidates_created,
                summary.prices_appended
            );
            if let Err(e) = repo.ack_job(received.id) {
                error!("failed to ack job {}: {e}", received.id);
                return Err(ServiceError::Internal);
            }
        }
        Err(e) => {
            error!("job {} failed, releasing for redelivery: {e}", received.id);
            if let Err(e) = repo.release_job(received.id) {
                error!("failed to release job {}: {e}", received.id);
                return Err(ServiceError::Internal);
            }
        }
    }

    Ok(true)
}

/// Long-poll the queue until externally terminated.
pub async fn run_worker<R, M, F, E>(
    repo: &R,
    marketplace: &Arc<M>,
    fetcher: &Arc<F>,
    embedder: &E,
    poll_interval: Duration,
) where
    R: JobQueue + CrawlUnitWriter,
    M: Marketplace + 'static,
    F: PageFetcher + 'static,
    E: TitleEmbedder,
{
    loop {
        match poll_once(repo, marketplace, fetcher, embedder).await {
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(poll_interval).await,
            // Queue trouble; back off before trying again.
            Err(_) => tokio::time::sleep(poll_interval).await,
        }
    }
}

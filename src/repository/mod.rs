use std::collections::HashMap;
use std::time::Duration;

use crate::db::{DbConnection, DbPool};
use crate::domain::candidate::Candidate;
use crate::domain::job::{CrawlJob, ReceivedJob};
use crate::domain::listing::{AggregatedListing, Listing};
use crate::domain::price::Price;
use crate::domain::product::Product;
use crate::domain::query::{CrawlRequest, Query};
use crate::domain::types::{ExternalId, JobId, ListingId, MarketplaceId, ProductId};

pub mod candidate;
pub mod crawl;
pub mod errors;
pub mod job;
pub mod listing;
pub mod price;
pub mod product;
pub mod query;
#[cfg(test)]
pub mod test;

pub use errors::{RepositoryError, RepositoryResult};

/// Delivery bookkeeping for the durable job queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Deliveries allowed before a job is dead-lettered.
    pub max_deliveries: i32,
    /// How long a released job stays invisible before redelivery.
    pub retry_backoff: Duration,
    /// How long a claimed job may stay inflight before it counts as
    /// abandoned and becomes claimable again.
    pub processing_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_deliveries: 5,
            retry_backoff: Duration::from_secs(60),
            processing_timeout: Duration::from_secs(3600),
        }
    }
}

/// Repository implementation backed by Diesel and SQLite.
///
/// The underlying `r2d2::Pool` is cheap to clone, allowing the repository to
/// be passed around freely between the pipeline stages.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
    queue: QueueConfig,
}

impl DieselRepository {
    /// Create a new repository from an established database pool.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            queue: QueueConfig::default(),
        }
    }

    /// Override the queue delivery bookkeeping.
    pub fn with_queue_config(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Get a pooled database connection.
    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }

    pub(crate) fn queue_config(&self) -> &QueueConfig {
        &self.queue
    }
}

/// One complete unit of reconciliation work: the aggregated listings of a
/// crawl cycle together with their precomputed title embeddings
/// (index-aligned with `listings`).
#[derive(Debug, Clone)]
pub struct CrawlUnit {
    pub marketplace_id: MarketplaceId,
    pub listings: Vec<AggregatedListing>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Row counts reported by a successful [`CrawlUnitWriter::persist_crawl`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub new_products: usize,
    pub new_listings: usize,
    pub candidates_created: usize,
    pub prices_appended: usize,
}

/// Read-only operations for query entities.
pub trait QueryReader {
    /// Map the given texts to their known `Query` rows; unknown texts are
    /// simply absent from the result.
    fn queries_by_text(&self, texts: &[&str]) -> RepositoryResult<HashMap<String, Query>>;
    /// The distinct active query texts with the maximum page depth
    /// requested across their subscribers.
    fn list_crawl_requests(&self) -> RepositoryResult<Vec<CrawlRequest>>;
}

/// Read-only operations for product entities.
pub trait ProductReader {
    /// Retrieve a product by its identifier.
    fn get_product_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>>;
    /// Top-1 nearest neighbour of the given vector over all stored product
    /// embeddings, by cosine distance.
    fn nearest_product(&self, embedding: &[f32]) -> RepositoryResult<Option<(ProductId, f32)>>;
}

/// Read-only operations for listing entities.
pub trait ListingReader {
    /// Look up a listing by its marketplace-scoped external identifier.
    fn get_listing_by_external_id(
        &self,
        marketplace_id: MarketplaceId,
        external_id: &ExternalId,
    ) -> RepositoryResult<Option<Listing>>;
}

/// Read-only operations over the per-listing price time series.
pub trait PriceReader {
    /// All price observations for a listing, oldest first.
    fn listing_prices(&self, listing_id: ListingId) -> RepositoryResult<Vec<Price>>;
}

/// Read-only access to the resolution audit trail.
pub trait CandidateReader {
    /// All resolution candidates recorded for a listing, oldest first.
    fn listing_candidates(&self, listing_id: ListingId) -> RepositoryResult<Vec<Candidate>>;
}

/// The transactional resolve-and-reconcile step. Everything a crawl unit
/// writes commits or rolls back as one.
pub trait CrawlUnitWriter {
    fn persist_crawl(&self, unit: &CrawlUnit) -> RepositoryResult<CrawlSummary>;
}

/// Durable work queue over opaque crawl-job payloads.
///
/// Delivery is at-least-once: a received job stays invisible until it is
/// acked (removed), released (requeued with a backoff), or its processing
/// deadline passes, at which point it is claimable again. Jobs that exhaust
/// their delivery budget are dead-lettered rather than redelivered.
pub trait JobQueue {
    fn enqueue_job(&self, job: &CrawlJob) -> RepositoryResult<JobId>;
    fn receive_job(&self) -> RepositoryResult<Option<ReceivedJob>>;
    fn ack_job(&self, id: JobId) -> RepositoryResult<()>;
    fn release_job(&self, id: JobId) -> RepositoryResult<()>;
}

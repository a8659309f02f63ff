use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::job::{CrawlJob, ReceivedJob};
use crate::domain::query::{CrawlRequest, Query};
use crate::domain::types::JobId;
use crate::repository::{
    CrawlSummary, CrawlUnit, CrawlUnitWriter, JobQueue, QueryReader, RepositoryError,
    RepositoryResult,
};

#[derive(Default)]
struct QueueState {
    next_id: i32,
    jobs: Vec<(JobId, CrawlJob, i32)>,
    acked: Vec<JobId>,
    released: Vec<JobId>,
}

/// Simple in-memory repository used for unit tests.
#[derive(Default)]
pub struct TestRepository {
    queries: Vec<Query>,
    requests: Vec<CrawlRequest>,
    queue: Mutex<QueueState>,
    persisted: Mutex<Vec<CrawlUnit>>,
    fail_persist: bool,
}

impl TestRepository {
    pub fn new(queries: Vec<Query>, requests: Vec<CrawlRequest>) -> Self {
        Self {
            queries,
            requests,
            ..Self::default()
        }
    }

    /// Make every `persist_crawl` call fail, for exercising error paths.
    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    pub fn enqueued_jobs(&self) -> Vec<CrawlJob> {
        self.queue
            .lock()
            .unwrap()
            .jobs
            .iter()
            .map(|(_, job, _)| job.clone())
            .collect()
    }

    pub fn acked_jobs(&self) -> Vec<JobId> {
        self.queue.lock().unwrap().acked.clone()
    }

    pub fn released_jobs(&self) -> Vec<JobId> {
        self.queue.lock().unwrap().released.clone()
    }

    pub fn persisted_units(&self) -> Vec<CrawlUnit> {
        self.persisted.lock().unwrap().clone()
    }
}

impl QueryReader for TestRepository {
    fn queries_by_text(&self, texts: &[&str]) -> RepositoryResult<HashMap<String, Query>> {
        Ok(self
            .queries
            .iter()
            .filter(|q| texts.contains(&q.text.as_str()))
            .map(|q| (q.text.as_str().to_string(), q.clone()))
            .collect())
    }

    fn list_crawl_requests(&self) -> RepositoryResult<Vec<CrawlRequest>> {
        Ok(self.requests.clone())
    }
}

impl JobQueue for TestRepository {
    fn enqueue_job(&self, job: &CrawlJob) -> RepositoryResult<JobId> {
        let mut queue = self.queue.lock().unwrap();
        queue.next_id += 1;
        let id = JobId::new(queue.next_id)?;
        queue.jobs.push((id, job.clone(), 0));
        Ok(id)
    }

    fn receive_job(&self) -> RepositoryResult<Option<ReceivedJob>> {
        let mut queue = self.queue.lock().unwrap();
        let Some((id, job, receive_count)) = queue.jobs.first_mut() else {
            return Ok(None);
        };
        *receive_count += 1;
        let received = ReceivedJob {
            id: *id,
            job: job.clone(),
            receive_count: *receive_count,
        };
        Ok(Some(received))
    }

    fn ack_job(&self, id: JobId) -> RepositoryResult<()> {
        let mut queue = self.queue.lock().unwrap();
        queue.jobs.retain(|(job_id, _, _)| *job_id != id);
        queue.acked.push(id);
        Ok(())
    }

    fn release_job(&self, id: JobId) -> RepositoryResult<()> {
        self.queue.lock().unwrap().released.push(id);
        Ok(())
    }
}

impl CrawlUnitWriter for TestRepository {
    fn persist_crawl(&self, unit: &CrawlUnit) -> RepositoryResult<CrawlSummary> {
        if self.fail_persist {
            return Err(RepositoryError::Validation("persist failure".into()));
        }
        let summary = CrawlSummary {
            new_products: unit.listings.len(),
            new_listings: unit.listings.len(),
            candidates_created: unit.listings.len(),
            prices_appended: unit.listings.len(),
        };
        self.persisted.lock().unwrap().push(unit.clone());
        Ok(summary)
    }
}

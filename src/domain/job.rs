use serde::{Deserialize, Serialize};

use crate::domain::types::{JobId, PageCount, QueryText, TypeConstraintError};

/// Message placed on the durable work queue: one per distinct query text,
/// carrying the maximum crawl depth requested across all subscribers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub query: QueryText,
    pub pages_to_scrape: PageCount,
}

/// Delivery state of a queued job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting to be picked up (possibly after a failed delivery).
    Queued,
    /// Claimed by a worker, invisible to other consumers until its
    /// processing deadline passes.
    Inflight,
    /// Exhausted its delivery budget; kept for inspection, never
    /// redelivered.
    Dead,
}

impl JobStatus {
    /// String representation used in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Inflight => "inflight",
            Self::Dead => "dead",
        }
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "queued" => Ok(Self::Queued),
            "inflight" => Ok(Self::Inflight),
            "dead" => Ok(Self::Dead),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "job status: {other}"
            ))),
        }
    }
}

/// A job claimed from the queue, as handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedJob {
    pub id: JobId,
    pub job: CrawlJob,
    /// How many times this job has been delivered, this delivery included.
    pub receive_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_crawl_job_message() {
        let message = CrawlJob {
            query: QueryText::new("laptop").unwrap(),
            pages_to_scrape: PageCount::new(2).unwrap(),
        };
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(
            value,
            serde_json::json!({ "query": "laptop", "pages_to_scrape": 2 })
        );
    }

    #[test]
    fn deserializes_crawl_job_message() {
        let value = serde_json::json!({ "query": "laptop", "pages_to_scrape": 2 });
        let parsed: CrawlJob = serde_json::from_value(value).unwrap();

        assert_eq!(parsed.query, "laptop");
        assert_eq!(parsed.pages_to_scrape, 2);
    }

    #[test]
    fn parses_job_status() {
        assert_eq!(JobStatus::try_from("queued").unwrap(), JobStatus::Queued);
        assert_eq!(JobStatus::try_from("dead").unwrap(), JobStatus::Dead);
        assert!(JobStatus::try_from("retrying").is_err());
    }

    #[test]
    fn rejects_zero_page_messages() {
        let value = serde_json::json!({ "query": "laptop", "pages_to_scrape": 0 });
        assert!(serde_json::from_value::<CrawlJob>(value).is_err());
    }
}

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::domain::job::{CrawlJob, JobStatus, ReceivedJob};
use crate::domain::types::JobId;
use crate::models::job::{CrawlJob as DbCrawlJob, NewCrawlJob};
use crate::repository::{DieselRepository, JobQueue, RepositoryError, RepositoryResult};

impl JobQueue for DieselRepository {
    fn enqueue_job(&self, job: &CrawlJob) -> RepositoryResult<JobId> {
        use crate::schema::crawl_jobs;

        let mut conn = self.conn()?;
        let payload = serde_json::to_string(job)?;
        let now = Utc::now().naive_utc();

        let id = diesel::insert_into(crawl_jobs::table)
            .values(NewCrawlJob {
                payload: &payload,
                status: JobStatus::Queued.as_str(),
                receive_count: 0,
                visible_at: now,
                created_at: now,
                updated_at: now,
            })
            .returning(crawl_jobs::id)
            .get_result::<i32>(&mut conn)?;

        Ok(JobId::new(id)?)
    }

    fn receive_job(&self) -> RepositoryResult<Option<ReceivedJob>> {
        use crate::schema::crawl_jobs;

        let max_deliveries = self.queue_config().max_deliveries;
        let deadline = chrono::Duration::from_std(self.queue_config().processing_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let mut conn = self.conn()?;

        conn.transaction::<Option<ReceivedJob>, RepositoryError, _>(|conn| {
            loop {
                let now = Utc::now().naive_utc();

                // Inflight rows past their processing deadline belong to a
                // worker that died without acking or releasing; they are
                // claimable again like any queued row.
                let Some(row) = crawl_jobs::table
                    .filter(
                        crawl_jobs::status
                            .eq(JobStatus::Queued.as_str())
                            .or(crawl_jobs::status.eq(JobStatus::Inflight.as_str())),
                    )
                    .filter(crawl_jobs::visible_at.le(now))
                    .order((crawl_jobs::created_at.asc(), crawl_jobs::id.asc()))
                    .first::<DbCrawlJob>(conn)
                    .optional()?
                else {
                    return Ok(None);
                };

                // Delivery budget spent: park the job instead of handing it
                // out again.
                if row.receive_count >= max_deliveries {
                    mark_dead(conn, row.id, now)?;
                    continue;
                }

                let job: CrawlJob = match serde_json::from_str(&row.payload) {
                    Ok(job) => job,
                    Err(err) => {
                        // A payload that no longer parses will never
                        // succeed; dead-letter it immediately.
                        log::warn!("dead-lettering job {} with bad payload: {err}", row.id);
                        mark_dead(conn, row.id, now)?;
                        continue;
                    }
                };

                let receive_count = row.receive_count + 1;
                diesel::update(crawl_jobs::table.filter(crawl_jobs::id.eq(row.id)))
                    .set((
                        crawl_jobs::status.eq(JobStatus::Inflight.as_str()),
                        crawl_jobs::receive_count.eq(receive_count),
                        crawl_jobs::visible_at.eq(now + deadline),
                        crawl_jobs::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                return Ok(Some(ReceivedJob {
                    id: JobId::new(row.id)?,
                    job,
                    receive_count,
                }));
            }
        })
    }

    fn ack_job(&self, id: JobId) -> RepositoryResult<()> {
        use crate::schema::crawl_jobs;

        let mut conn = self.conn()?;
        diesel::delete(crawl_jobs::table.filter(crawl_jobs::id.eq(id.get())))
            .execute(&mut conn)?;
        Ok(())
    }

    fn release_job(&self, id: JobId) -> RepositoryResult<()> {
        use crate::schema::crawl_jobs;

        let backoff = chrono::Duration::from_std(self.queue_config().retry_backoff)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();

        diesel::update(crawl_jobs::table.filter(crawl_jobs::id.eq(id.get())))
            .set((
                crawl_jobs::status.eq(JobStatus::Queued.as_str()),
                crawl_jobs::visible_at.eq(now + backoff),
                crawl_jobs::updated_at.eq(now),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

fn mark_dead(
    conn: &mut SqliteConnection,
    id: i32,
    now: chrono::NaiveDateTime,
) -> RepositoryResult<()> {
    use crate::schema::crawl_jobs;

    diesel::update(crawl_jobs::table.filter(crawl_jobs::id.eq(id)))
        .set((
            crawl_jobs::status.eq(JobStatus::Dead.as_str()),
            crawl_jobs::updated_at.eq(now),
        ))
        .execute(conn)?;
    Ok(())
}

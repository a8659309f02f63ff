use std::time::Duration;

use chrono::Utc;
use diesel::prelude::*;
use mercurio::domain::job::{CrawlJob, JobStatus};
use mercurio::domain::types::{PageCount, QueryText};
use mercurio::embedding::{EMBEDDING_DIM, normalize, vector_to_blob};
use mercurio::repository::{
    DieselRepository, JobQueue, ProductReader, QueryReader, QueueConfig,
};
use mercurio::schema::{crawl_jobs, product_embeddings, products, queries, subscriptions};

mod common;

fn seed_query(pool: &mercurio::db::DbPool, text: &str, removed: bool) -> i32 {
    let mut conn = pool.get().expect("should acquire connection");
    let removed_at = removed.then(|| Utc::now().naive_utc());
    diesel::insert_into(queries::table)
        .values((queries::query_text.eq(text), queries::removed_at.eq(removed_at)))
        .returning(queries::id)
        .get_result(&mut conn)
        .expect("should insert query")
}

fn seed_subscription(pool: &mercurio::db::DbPool, query_id: i32, pages: i32, removed: bool) {
    let mut conn = pool.get().expect("should acquire connection");
    let removed_at = removed.then(|| Utc::now().naive_utc());
    diesel::insert_into(subscriptions::table)
        .values((
            subscriptions::query_id.eq(query_id),
            subscriptions::pages_to_scrape.eq(pages),
            subscriptions::removed_at.eq(removed_at),
        ))
        .execute(&mut conn)
        .expect("should insert subscription");
}

fn seed_product_with_embedding(pool: &mercurio::db::DbPool, name: &str, vector: &[f32]) -> i32 {
    let mut conn = pool.get().expect("should acquire connection");
    let product_id: i32 = diesel::insert_into(products::table)
        .values(products::name.eq(name))
        .returning(products::id)
        .get_result(&mut conn)
        .expect("should insert product");
    diesel::insert_into(product_embeddings::table)
        .values((
            product_embeddings::product_id.eq(product_id),
            product_embeddings::embedding.eq(vector_to_blob(vector)),
        ))
        .execute(&mut conn)
        .expect("should insert embedding");
    product_id
}

fn axis_vector(axis: usize) -> Vec<f32> {
    let mut vector = vec![0.0; EMBEDDING_DIM];
    vector[axis] = 1.0;
    vector
}

fn sample_job() -> CrawlJob {
    CrawlJob {
        query: QueryText::new("laptop").expect("valid query"),
        pages_to_scrape: PageCount::new(2).expect("valid page count"),
    }
}

#[test]
fn queries_by_text_skips_unknown_and_removed() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    seed_query(&test_db.pool(), "laptop", false);
    seed_query(&test_db.pool(), "monitor", true);

    let map = repo
        .queries_by_text(&["laptop", "monitor", "teclado"])
        .expect("should load queries");

    assert_eq!(map.len(), 1);
    assert!(map.contains_key("laptop"));
}

#[test]
fn crawl_requests_take_max_pages_per_distinct_text() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    let laptop = seed_query(&test_db.pool(), "laptop", false);
    let monitor = seed_query(&test_db.pool(), "monitor", false);
    let removed = seed_query(&test_db.pool(), "gone", true);
    seed_subscription(&test_db.pool(), laptop, 1, false);
    seed_subscription(&test_db.pool(), laptop, 3, false);
    seed_subscription(&test_db.pool(), laptop, 5, true);
    seed_subscription(&test_db.pool(), monitor, 2, false);
    seed_subscription(&test_db.pool(), removed, 4, false);

    let requests = repo.list_crawl_requests().expect("should list requests");

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].text, "laptop");
    assert_eq!(requests[0].pages, 3);
    assert_eq!(requests[1].text, "monitor");
    assert_eq!(requests[1].pages, 2);
}

#[test]
fn job_lifecycle_enqueue_receive_ack() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    assert!(repo.receive_job().expect("empty queue").is_none());

    let id = repo.enqueue_job(&sample_job()).expect("should enqueue");
    let received = repo
        .receive_job()
        .expect("should receive")
        .expect("job should be available");

    assert_eq!(received.id, id);
    assert_eq!(received.receive_count, 1);
    assert_eq!(received.job, sample_job());
    // Inflight jobs are invisible to other consumers.
    assert!(repo.receive_job().expect("receive").is_none());

    repo.ack_job(id).expect("should ack");

    let mut conn = test_db.pool().get().expect("conn");
    let remaining: i64 = crawl_jobs::table
        .count()
        .get_result(&mut conn)
        .expect("count");
    assert_eq!(remaining, 0);
}

#[test]
fn released_jobs_wait_out_the_backoff() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    let id = repo.enqueue_job(&sample_job()).expect("should enqueue");
    repo.receive_job().expect("receive").expect("job");
    repo.release_job(id).expect("should release");

    // Default backoff is 60s, so the job stays invisible.
    assert!(repo.receive_job().expect("receive").is_none());
}

#[test]
fn released_jobs_are_redelivered_after_the_backoff() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool()).with_queue_config(QueueConfig {
        retry_backoff: Duration::ZERO,
        ..QueueConfig::default()
    });

    let id = repo.enqueue_job(&sample_job()).expect("should enqueue");
    repo.receive_job().expect("receive").expect("job");
    repo.release_job(id).expect("should release");

    let second = repo
        .receive_job()
        .expect("receive")
        .expect("job should come back");
    assert_eq!(second.id, id);
    assert_eq!(second.receive_count, 2);
}

#[test]
fn abandoned_inflight_jobs_are_reclaimed_after_the_deadline() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool()).with_queue_config(QueueConfig {
        processing_timeout: Duration::ZERO,
        ..QueueConfig::default()
    });

    let id = repo.enqueue_job(&sample_job()).expect("should enqueue");
    let first = repo.receive_job().expect("receive").expect("job");
    assert_eq!(first.receive_count, 1);

    // No ack and no release: the claiming worker died. Once the deadline
    // passes the job is claimable again, and the delivery is counted.
    let second = repo
        .receive_job()
        .expect("receive")
        .expect("abandoned job should be redelivered");
    assert_eq!(second.id, id);
    assert_eq!(second.receive_count, 2);
}

#[test]
fn repeatedly_abandoned_jobs_are_dead_lettered() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool()).with_queue_config(QueueConfig {
        max_deliveries: 2,
        processing_timeout: Duration::ZERO,
        ..QueueConfig::default()
    });

    let id = repo.enqueue_job(&sample_job()).expect("should enqueue");
    repo.receive_job().expect("receive").expect("job");
    repo.receive_job().expect("receive").expect("job");

    // Reclaims count toward the delivery budget.
    assert!(repo.receive_job().expect("receive").is_none());

    let mut conn = test_db.pool().get().expect("conn");
    let status: String = crawl_jobs::table
        .filter(crawl_jobs::id.eq(id.get()))
        .select(crawl_jobs::status)
        .first(&mut conn)
        .expect("job row should remain");
    assert_eq!(status, JobStatus::Dead.as_str());
}

#[test]
fn jobs_exceeding_the_delivery_budget_are_dead_lettered() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool()).with_queue_config(QueueConfig {
        max_deliveries: 2,
        retry_backoff: Duration::ZERO,
        ..QueueConfig::default()
    });

    let id = repo.enqueue_job(&sample_job()).expect("should enqueue");
    for _ in 0..2 {
        repo.receive_job().expect("receive").expect("job");
        repo.release_job(id).expect("release");
    }

    // Budget exhausted: parked instead of redelivered.
    assert!(repo.receive_job().expect("receive").is_none());

    let mut conn = test_db.pool().get().expect("conn");
    let status: String = crawl_jobs::table
        .filter(crawl_jobs::id.eq(id.get()))
        .select(crawl_jobs::status)
        .first(&mut conn)
        .expect("job row should remain");
    assert_eq!(status, JobStatus::Dead.as_str());
}

#[test]
fn corrupt_payloads_are_dead_lettered_immediately() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    let mut conn = test_db.pool().get().expect("conn");
    let now = Utc::now().naive_utc();
    diesel::insert_into(crawl_jobs::table)
        .values((
            crawl_jobs::payload.eq("{not json"),
            crawl_jobs::status.eq(JobStatus::Queued.as_str()),
            crawl_jobs::receive_count.eq(0),
            crawl_jobs::visible_at.eq(now),
            crawl_jobs::created_at.eq(now),
            crawl_jobs::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .expect("should insert raw job");
    drop(conn);

    assert!(repo.receive_job().expect("receive").is_none());

    let mut conn = test_db.pool().get().expect("conn");
    let status: String = crawl_jobs::table
        .select(crawl_jobs::status)
        .first(&mut conn)
        .expect("row");
    assert_eq!(status, JobStatus::Dead.as_str());
}

#[test]
fn nearest_product_returns_the_closest_embedding() {
    let test_db = common::TestDb::new();
    let repo = DieselRepository::new(test_db.pool());

    assert!(
        repo.nearest_product(&axis_vector(0))
            .expect("scan")
            .is_none()
    );

    let close = seed_product_with_embedding(&test_db.pool(), "close", &axis_vector(0));
    seed_product_with_embedding(&test_db.pool(), "far", &axis_vector(1));
    // 45 degrees away from axis 0.
    let diagonal = {
        let mut vector = vec![0.0; EMBEDDING_DIM];
        vector[0] = 1.0;
        vector[1] = 1.0;
        normalize(vector)
    };
    seed_product_with_embedding(&test_db.pool(), "diagonal", &diagonal);

    let (product_id, distance) = repo
        .nearest_product(&axis_vector(0))
        .expect("scan")
        .expect("neighbour");

    assert_eq!(product_id, close);
    assert!(distance.abs() < 1.0e-6);
}

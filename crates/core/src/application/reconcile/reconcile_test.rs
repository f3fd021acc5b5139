//! Unit tests for the reconciliation engine

use super::*;
use crate::domain::timestamp::from_millis;
use crate::domain::JobFields;
use crate::error::AppError;
use crate::port::record_store::mocks::InMemoryRecordStore;
use crate::port::time_provider::mocks::ManualClock;

struct Fixture {
    store: Arc<InMemoryRecordStore>,
    delta: Arc<InMemoryRecordStore>,
    clock: Arc<ManualClock>,
    service: ReconcileService,
}

fn fixture_with(store: InMemoryRecordStore) -> Fixture {
    let store = Arc::new(store);
    let delta = Arc::new(InMemoryRecordStore::new("delta"));
    let clock = Arc::new(ManualClock::new(1_000));
    let service = ReconcileService::new(store.clone(), delta.clone(), clock.clone());
    Fixture {
        store,
        delta,
        clock,
        service,
    }
}

fn fixture() -> Fixture {
    fixture_with(InMemoryRecordStore::new("store"))
}

fn candidate(fields: JobFields, clock: &ManualClock) -> JobRecord {
    JobRecord::create(fields, clock.now())
}

fn amazon_sde2() -> JobFields {
    JobFields::new("SDE2", "Amazon")
        .with_job_id("123")
        .with_link("https://a/123")
}

#[tokio::test]
async fn test_scenario_insert_then_update() {
    let f = fixture();

    let first = f
        .service
        .reconcile(vec![candidate(amazon_sde2(), &f.clock)])
        .await
        .unwrap();
    assert_eq!(first.all_records.len(), 1);
    assert_eq!(first.new_records.len(), 1);
    assert_eq!(first.new_records[0], first.all_records[0]);

    f.clock.advance(60_000);
    let second = f
        .service
        .reconcile(vec![candidate(
            amazon_sde2().with_description("updated"),
            &f.clock,
        )])
        .await
        .unwrap();

    assert_eq!(second.all_records.len(), 1);
    assert_eq!(second.all_records[0].description, "updated");
    assert!(second.new_records.is_empty());
    assert_eq!(second.updated, 1);
}

#[tokio::test]
async fn test_idempotent_reconciliation() {
    let f = fixture();
    let batch = vec![
        candidate(amazon_sde2(), &f.clock),
        candidate(JobFields::new("SRE", "Google").with_job_id("g-1"), &f.clock),
        candidate(JobFields::new("PM", "Meta").with_link("https://m/9"), &f.clock),
    ];

    let first = f.service.reconcile(batch.clone()).await.unwrap();
    assert_eq!(first.new_records.len(), 3);

    f.clock.advance(10);
    let second = f.service.reconcile(batch).await.unwrap();

    assert!(second.new_records.is_empty());
    assert_eq!(second.all_records.len(), first.all_records.len());
    for (before, after) in first.all_records.iter().zip(second.all_records.iter()) {
        assert_eq!(before.identity_key(), after.identity_key());
        assert_eq!(before.first_seen_at, after.first_seen_at);
        assert!(after.last_updated_at > before.last_updated_at);
    }
}

#[tokio::test]
async fn test_first_seen_preserved_and_last_updated_increases() {
    let f = fixture();
    let original = f
        .service
        .reconcile(vec![candidate(amazon_sde2(), &f.clock)])
        .await
        .unwrap()
        .all_records[0]
        .clone();

    f.clock.advance(5_000);
    let refreshed = f
        .service
        .reconcile(vec![candidate(
            amazon_sde2().with_description("now with details"),
            &f.clock,
        )])
        .await
        .unwrap()
        .all_records[0]
        .clone();

    assert_eq!(refreshed.first_seen_at, original.first_seen_at);
    assert!(refreshed.last_updated_at > original.last_updated_at);
    assert_eq!(refreshed.last_updated_at, from_millis(6_000));
}

#[tokio::test]
async fn test_last_updated_increases_even_without_clock_movement() {
    let f = fixture();
    let batch = vec![candidate(amazon_sde2(), &f.clock)];

    let first = f.service.reconcile(batch.clone()).await.unwrap();
    let second = f.service.reconcile(batch).await.unwrap();

    assert!(second.all_records[0].last_updated_at > first.all_records[0].last_updated_at);
}

#[tokio::test]
async fn test_invalid_candidates_are_dropped() {
    let f = fixture();
    let batch = vec![
        candidate(JobFields::new("", "Amazon").with_job_id("1"), &f.clock),
        candidate(JobFields::new("No id or link", "Amazon"), &f.clock),
        candidate(amazon_sde2(), &f.clock),
    ];

    let outcome = f.service.reconcile(batch).await.unwrap();

    assert_eq!(outcome.dropped, 2);
    assert_eq!(outcome.all_records.len(), 1);
    assert_eq!(outcome.new_records.len(), 1);
    assert!(outcome.all_records.iter().all(|r| !r.title.is_empty()));
    assert!(f
        .delta
        .snapshot()
        .unwrap()
        .iter()
        .all(|r| !r.title.is_empty()));
}

#[tokio::test]
async fn test_store_and_delta_are_persisted() {
    let f = fixture();
    f.service
        .reconcile(vec![candidate(amazon_sde2(), &f.clock)])
        .await
        .unwrap();

    assert_eq!(f.store.snapshot().unwrap().len(), 1);
    assert_eq!(f.delta.snapshot().unwrap().len(), 1);

    // Delta is overwritten, not accumulated
    f.clock.advance(1_000);
    f.service
        .reconcile(vec![candidate(
            JobFields::new("SRE", "Google").with_job_id("g-1"),
            &f.clock,
        )])
        .await
        .unwrap();

    let delta = f.delta.snapshot().unwrap();
    assert_eq!(delta.len(), 1);
    assert_eq!(delta[0].company, "Google");
    assert_eq!(f.store.snapshot().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_delta_is_still_written() {
    let f = fixture();
    let batch = vec![candidate(amazon_sde2(), &f.clock)];
    f.service.reconcile(batch.clone()).await.unwrap();
    f.service.reconcile(batch).await.unwrap();

    assert_eq!(f.delta.save_count(), 2);
    assert!(f.delta.snapshot().unwrap().is_empty());
}

#[tokio::test]
async fn test_all_records_newest_first() {
    let f = fixture();
    f.service
        .reconcile(vec![candidate(amazon_sde2(), &f.clock)])
        .await
        .unwrap();

    f.clock.advance(1_000);
    let outcome = f
        .service
        .reconcile(vec![candidate(
            JobFields::new("SRE", "Google").with_job_id("g-1"),
            &f.clock,
        )])
        .await
        .unwrap();

    let companies: Vec<_> = outcome.all_records.iter().map(|r| r.company.as_str()).collect();
    assert_eq!(companies, vec!["Google", "Amazon"]);
}

#[tokio::test]
async fn test_duplicate_candidates_in_one_batch_count_once() {
    let f = fixture();
    let batch = vec![
        candidate(amazon_sde2().with_description("first"), &f.clock),
        candidate(amazon_sde2().with_description("second"), &f.clock),
    ];

    let outcome = f.service.reconcile(batch).await.unwrap();

    assert_eq!(outcome.all_records.len(), 1);
    assert_eq!(outcome.new_records.len(), 1);
    assert_eq!(outcome.new_records[0].description, "second");
    assert_eq!(outcome.updated, 1);
}

#[tokio::test]
async fn test_corrupt_store_is_fatal_and_nothing_is_written() {
    let existing = JobRecord::create(amazon_sde2(), from_millis(10));
    let f = fixture_with(InMemoryRecordStore::with_records("store", vec![existing.clone()]));
    f.store.fail_loads("unterminated quote on line 3");

    let err = f
        .service
        .reconcile(vec![candidate(
            JobFields::new("SRE", "Google").with_job_id("g-1"),
            &f.clock,
        )])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Codec(_)));
    assert_eq!(f.store.save_count(), 0);
    assert_eq!(f.delta.save_count(), 0);
    assert_eq!(f.store.snapshot().unwrap(), vec![existing]);
}

#[tokio::test]
async fn test_persist_failure_propagates() {
    let f = fixture();
    f.store.fail_saves("disk full");

    let err = f
        .service
        .reconcile(vec![candidate(amazon_sde2(), &f.clock)])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Persist(_)));
    assert_eq!(f.delta.save_count(), 0);
}

#[tokio::test]
async fn test_absent_store_starts_empty() {
    let f = fixture();
    let outcome = f.service.reconcile(Vec::new()).await.unwrap();

    assert!(outcome.all_records.is_empty());
    assert!(outcome.new_records.is_empty());
    assert_eq!(f.store.snapshot(), Some(Vec::new()));
}

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 写入扇出集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{unique_username, Harness};
use oxfanout::adapter::{CacheStore, DurableStore};
use oxfanout::coordinator::{CoordinatorSettings, WriteCoordinator};
use oxfanout::metrics::Metrics;
use oxfanout::model::{EventKind, FailureReason, Target, UserRecord, WriteOutcome, WriteStatus};
use oxfanout::FanoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn writer(harness: &Harness) -> WriteCoordinator {
    let settings = CoordinatorSettings::default().with_adapter_timeout(Duration::from_millis(200));
    WriteCoordinator::new(harness.adapters(), settings, Arc::new(Metrics::new()))
}

#[tokio::test]
async fn test_write_reaches_every_target() {
    let harness = Harness::new();
    let username = unique_username("alice");
    let record = UserRecord::new(username.clone())
        .with_attribute("city", "Oslo")
        .with_attribute("age", 30);

    let result = writer(&harness).write(&record).await.unwrap();

    assert_eq!(result.overall, WriteStatus::FullyCommitted);
    assert_eq!(result.username, username);
    assert_eq!(
        harness.relational.inner.fetch(&username).await.unwrap(),
        Some(record.clone())
    );
    assert_eq!(
        harness.wide_column.inner.fetch(&username).await.unwrap(),
        Some(record.clone())
    );
    assert_eq!(
        harness.cache.inner.get(&username).await.unwrap(),
        Some(record.clone())
    );

    let events = harness.publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::UserUpserted);
    assert_eq!(events[0].record, record);
    let topic = harness.publisher.published.lock().unwrap()[0].0.clone();
    assert_eq!(topic, "userExchange");
}

#[tokio::test]
async fn test_rewrite_replaces_whole_record() {
    let harness = Harness::new();
    let writer = writer(&harness);
    let username = unique_username("bob");

    let first = UserRecord::new(username.clone())
        .with_attribute("city", "Oslo")
        .with_attribute("phone", "555");
    writer.write(&first).await.unwrap();
    let second = UserRecord::new(username.clone()).with_attribute("city", "Bergen");
    writer.write(&second).await.unwrap();

    let stored = harness.relational.inner.fetch(&username).await.unwrap().unwrap();
    assert_eq!(stored, second);
    assert!(!stored.attributes.contains_key("phone"));
    assert_eq!(harness.publisher.events().len(), 2);
}

#[tokio::test]
async fn test_one_durable_failure_is_partial() {
    let harness = Harness::new();
    harness.wide_column.faults.set_failing(true);
    let username = unique_username("carol");

    let result = writer(&harness)
        .write(&UserRecord::new(username.clone()))
        .await
        .unwrap();

    assert_eq!(result.overall, WriteStatus::PartiallyCommitted);
    assert!(result.relational.is_committed());
    assert!(result.wide_column.is_failed());
    assert!(result.cache.is_committed());
    assert!(result.publisher.is_committed());
    assert_eq!(result.failed_targets(), vec![Target::WideColumn]);
    assert!(harness.relational.inner.fetch(&username).await.unwrap().is_some());
    assert!(harness.wide_column.inner.fetch(&username).await.unwrap().is_none());
}

#[tokio::test]
async fn test_both_durable_failures_still_attempt_cache_and_publish() {
    let harness = Harness::new();
    harness.relational.faults.set_failing(true);
    harness.wide_column.faults.set_failing(true);

    let result = writer(&harness)
        .write(&UserRecord::new(unique_username("dave")))
        .await
        .unwrap();

    assert_eq!(result.overall, WriteStatus::Failed);
    assert_eq!(harness.cache.faults.calls(), 1);
    assert_eq!(harness.publisher.faults.calls(), 1);
}

#[tokio::test]
async fn test_cache_and_publisher_failures_do_not_affect_overall() {
    let harness = Harness::new();
    harness.cache.faults.set_failing(true);
    harness.publisher.faults.set_failing(true);

    let result = writer(&harness)
        .write(&UserRecord::new(unique_username("erin")))
        .await
        .unwrap();

    assert_eq!(result.overall, WriteStatus::FullyCommitted);
    assert!(result.cache.is_failed());
    assert!(result.publisher.is_failed());
    assert_eq!(
        result.failed_targets(),
        vec![Target::Cache, Target::Publisher]
    );
}

#[tokio::test]
async fn test_durable_writes_run_concurrently() {
    let harness = Harness::new();
    let delay = Duration::from_millis(300);
    harness.relational.faults.set_delay(delay);
    harness.wide_column.faults.set_delay(delay);

    let settings = CoordinatorSettings::default().with_adapter_timeout(Duration::from_secs(2));
    let writer = WriteCoordinator::new(harness.adapters(), settings, Arc::new(Metrics::new()));

    let start = Instant::now();
    let result = writer
        .write(&UserRecord::new(unique_username("frank")))
        .await
        .unwrap();

    assert_eq!(result.overall, WriteStatus::FullyCommitted);
    // 串行执行至少需要两倍延迟
    assert!(start.elapsed() < delay * 2);
}

#[tokio::test]
async fn test_hung_store_is_bounded_by_timeout() {
    let harness = Harness::new();
    harness.relational.faults.set_delay(Duration::from_secs(10));

    let start = Instant::now();
    let result = writer(&harness)
        .write(&UserRecord::new(unique_username("grace")))
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(result.overall, WriteStatus::PartiallyCommitted);
    assert_eq!(
        result.relational,
        WriteOutcome::Failed(FailureReason::Timeout { after_ms: 200 })
    );
}

#[tokio::test]
async fn test_invalid_input_has_no_side_effects() {
    let harness = Harness::new();
    let result = writer(&harness).write(&UserRecord::new("  ")).await;

    assert!(matches!(result, Err(FanoutError::InvalidInput(_))));
    assert_eq!(harness.relational.faults.calls(), 0);
    assert_eq!(harness.wide_column.faults.calls(), 0);
    assert_eq!(harness.cache.faults.calls(), 0);
    assert_eq!(harness.publisher.faults.calls(), 0);
}

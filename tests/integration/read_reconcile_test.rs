//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 读取协调集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{unique_username, Harness};
use oxfanout::adapter::{CacheStore, DurableStore};
use oxfanout::coordinator::{CoordinatorSettings, ReadCoordinator};
use oxfanout::metrics::Metrics;
use oxfanout::model::{
    CacheRepair, Divergence, ReadStatus, Source, SourceRead, UserRecord,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn reader(harness: &Harness) -> (ReadCoordinator, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new());
    let settings = CoordinatorSettings::default().with_adapter_timeout(Duration::from_millis(200));
    (
        ReadCoordinator::new(harness.adapters(), settings, metrics.clone()),
        metrics,
    )
}

#[tokio::test]
async fn test_cache_miss_is_repaired_from_relational() {
    let harness = Harness::new();
    let username = unique_username("alice");
    let record = UserRecord::new(username.clone()).with_attribute("city", "Oslo");
    harness.relational.inner.upsert(&record).await.unwrap();
    harness.wide_column.inner.upsert(&record).await.unwrap();

    let (reader, metrics) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.status, ReadStatus::Found);
    assert_eq!(result.merged, Some(record.clone()));
    assert_eq!(result.repair, CacheRepair::Written);
    assert_eq!(
        result.found_in,
        BTreeSet::from([Source::Relational, Source::WideColumn])
    );
    assert_eq!(harness.cache.inner.get(&username).await.unwrap(), Some(record));
    assert_eq!(metrics.request_count("cache", "read", "miss"), 1);
    assert_eq!(metrics.request_count("cache", "repair", "committed"), 1);

    // 第二次读取缓存已一致，不再修复
    let result = reader.read(&username).await.unwrap();
    assert_eq!(result.repair, CacheRepair::NotNeeded);
    assert_eq!(result.found_in.len(), 3);
}

#[tokio::test]
async fn test_stale_cache_is_overwritten() {
    let harness = Harness::new();
    let username = unique_username("bob");
    let stale = UserRecord::new(username.clone()).with_attribute("city", "Bergen");
    let fresh = UserRecord::new(username.clone()).with_attribute("city", "Oslo");
    harness.cache.inner.set(&username, &stale, None).await.unwrap();
    harness.relational.inner.upsert(&fresh).await.unwrap();

    let (reader, _) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.merged, Some(fresh.clone()));
    assert_eq!(result.cache, SourceRead::Hit(stale));
    assert_eq!(result.repair, CacheRepair::Written);
    assert_eq!(harness.cache.inner.get(&username).await.unwrap(), Some(fresh));
}

#[tokio::test]
async fn test_relational_wins_content_mismatch() {
    let harness = Harness::new();
    let username = unique_username("carol");
    let relational = UserRecord::new(username.clone()).with_attribute("tier", "gold");
    let wide_column = UserRecord::new(username.clone()).with_attribute("tier", "silver");
    harness.relational.inner.upsert(&relational).await.unwrap();
    harness.wide_column.inner.upsert(&wide_column).await.unwrap();

    let (reader, _) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.merged, Some(relational));
    assert_eq!(result.divergence(), Some(Divergence::ContentMismatch));
    // 读取路径不回填持久化存储
    assert_eq!(
        harness.wide_column.inner.fetch(&username).await.unwrap(),
        Some(wide_column)
    );
}

#[tokio::test]
async fn test_relational_down_falls_back_to_wide_column() {
    let harness = Harness::new();
    let username = unique_username("dave");
    let record = UserRecord::new(username.clone());
    harness.wide_column.inner.upsert(&record).await.unwrap();
    harness.relational.faults.set_failing(true);

    let (reader, _) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.status, ReadStatus::Found);
    assert_eq!(result.merged, Some(record));
    assert_eq!(result.found_in, BTreeSet::from([Source::WideColumn]));
    assert_eq!(result.failed_sources(), vec![Source::Relational]);
    // 关系型存储状态未知，不能判定为分歧
    assert_eq!(result.divergence(), None);
}

#[tokio::test]
async fn test_orphan_cache_entry_is_evicted() {
    let harness = Harness::new();
    let username = unique_username("erin");
    let orphan = UserRecord::new(username.clone());
    harness.cache.inner.set(&username, &orphan, None).await.unwrap();

    let (reader, _) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.status, ReadStatus::NotFound);
    assert_eq!(result.merged, None);
    assert_eq!(result.repair, CacheRepair::Evicted);
    assert_eq!(harness.cache.inner.get(&username).await.unwrap(), None);
}

#[tokio::test]
async fn test_unreadable_orphan_cache_entry_is_evicted() {
    let harness = Harness::new();
    let username = unique_username("ghost");
    let orphan = UserRecord::new(username.clone());
    harness.cache.inner.set(&username, &orphan, None).await.unwrap();
    harness
        .cache
        .failing_reads
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let (reader, metrics) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.status, ReadStatus::NotFound);
    assert!(result.cache.is_failed());
    assert_eq!(result.repair, CacheRepair::Evicted);
    assert_eq!(harness.cache.inner.get(&username).await.unwrap(), None);
    assert_eq!(metrics.request_count("cache", "repair", "committed"), 1);

    // 之后持久化存储故障也不会再返回残留值
    harness
        .cache
        .failing_reads
        .store(false, std::sync::atomic::Ordering::SeqCst);
    harness.relational.faults.set_failing(true);
    let result = reader.read(&username).await.unwrap();
    assert_eq!(result.status, ReadStatus::Unavailable);
    assert_eq!(result.merged, None);
}

#[tokio::test]
async fn test_cache_served_when_durable_unreachable() {
    let harness = Harness::new();
    let username = unique_username("frank");
    let cached = UserRecord::new(username.clone()).with_attribute("city", "Oslo");
    harness.cache.inner.set(&username, &cached, None).await.unwrap();
    harness.relational.faults.set_failing(true);
    harness.wide_column.faults.set_failing(true);

    let (reader, _) = reader(&harness);
    let result = reader.read(&username).await.unwrap();

    assert_eq!(result.status, ReadStatus::Found);
    assert_eq!(result.merged, Some(cached.clone()));
    assert_eq!(result.repair, CacheRepair::NotNeeded);
    assert_eq!(harness.cache.inner.get(&username).await.unwrap(), Some(cached));
}

#[tokio::test]
async fn test_all_sources_failing_is_unavailable() {
    let harness = Harness::new();
    harness.relational.faults.set_failing(true);
    harness.wide_column.faults.set_failing(true);
    harness.cache.faults.set_failing(true);

    let (reader, _) = reader(&harness);
    let result = reader.read(&unique_username("grace")).await.unwrap();

    assert_eq!(result.status, ReadStatus::Unavailable);
    assert_eq!(
        result.failed_sources(),
        vec![Source::Cache, Source::Relational, Source::WideColumn]
    );
    assert_eq!(result.repair, CacheRepair::NotNeeded);
}

#[tokio::test]
async fn test_reads_run_concurrently_and_are_bounded() {
    let harness = Harness::new();
    harness.relational.faults.set_delay(Duration::from_secs(10));
    harness.wide_column.faults.set_delay(Duration::from_millis(50));
    harness.cache.faults.set_delay(Duration::from_millis(50));
    let username = unique_username("heidi");
    let record = UserRecord::new(username.clone());
    harness.wide_column.inner.upsert(&record).await.unwrap();

    let (reader, metrics) = reader(&harness);
    let start = Instant::now();
    let result = reader.read(&username).await.unwrap();

    // 200ms 超时 + 50ms 缓存回写
    assert!(start.elapsed() < Duration::from_millis(1000));
    assert_eq!(result.merged, Some(record));
    assert!(result.relational.is_failed());
    assert_eq!(metrics.request_count("relational", "read", "timeout"), 1);
}

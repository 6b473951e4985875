//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读取协调器。
//!
//! 并发读取缓存和两个持久化存储，合并出一个权威值，并在需要时修复缓存。
//! 持久化存储之间的分歧只会被记录，读取路径不会互相回填。

use super::{bounded, CoordinatorSettings};
use crate::adapter::{AdapterSet, DurableStore};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::model::{
    validate_username, CacheRepair, ReadResult, ReadStatus, Source, SourceRead, Target,
    UserRecord,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 缓存修复计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RepairPlan {
    None,
    Write(UserRecord),
    Evict,
}

/// 合并结果，不含任何副作用
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reconciliation {
    pub merged: Option<UserRecord>,
    pub found_in: BTreeSet<Source>,
    pub status: ReadStatus,
    pub plan: RepairPlan,
}

/// 由三个数据源的读取结果计算合并值和缓存修复计划
///
/// 优先级：关系型存储 > 宽列存储 > 缓存。
/// 只有两个持久化存储都成功应答"不存在"时才能判定记录不存在；
/// 此时残留的缓存项会被删除。
pub(crate) fn reconcile(
    cache: &SourceRead,
    relational: &SourceRead,
    wide_column: &SourceRead,
) -> Reconciliation {
    let found_in: BTreeSet<Source> = [
        (Source::Cache, cache),
        (Source::Relational, relational),
        (Source::WideColumn, wide_column),
    ]
    .into_iter()
    .filter(|(_, read)| read.value().is_some())
    .map(|(source, _)| source)
    .collect();

    if let Some(record) = relational.value().or_else(|| wide_column.value()) {
        let plan = if cache.value() == Some(record) {
            RepairPlan::None
        } else {
            RepairPlan::Write(record.clone())
        };
        return Reconciliation {
            merged: Some(record.clone()),
            found_in,
            status: ReadStatus::Found,
            plan,
        };
    }

    let durable_confirmed_absent = relational.is_miss() && wide_column.is_miss();

    match cache.value() {
        Some(_) if durable_confirmed_absent => Reconciliation {
            merged: None,
            found_in,
            status: ReadStatus::NotFound,
            plan: RepairPlan::Evict,
        },
        // 持久化存储状态未知时，缓存值是唯一可用的答案
        Some(cached) => Reconciliation {
            merged: Some(cached.clone()),
            found_in,
            status: ReadStatus::Found,
            plan: RepairPlan::None,
        },
        // 缓存读取失败时条目可能仍然存在，持久化存储确认不存在即删除
        None if durable_confirmed_absent => Reconciliation {
            merged: None,
            found_in,
            status: ReadStatus::NotFound,
            plan: if cache.is_failed() {
                RepairPlan::Evict
            } else {
                RepairPlan::None
            },
        },
        None => Reconciliation {
            merged: None,
            found_in,
            status: ReadStatus::Unavailable,
            plan: RepairPlan::None,
        },
    }
}

/// 读取协调器
#[derive(Debug, Clone)]
pub struct ReadCoordinator {
    adapters: AdapterSet,
    settings: CoordinatorSettings,
    metrics: Arc<Metrics>,
}

impl ReadCoordinator {
    pub fn new(adapters: AdapterSet, settings: CoordinatorSettings, metrics: Arc<Metrics>) -> Self {
        Self {
            adapters,
            settings,
            metrics,
        }
    }

    /// 读取并合并一条用户记录
    ///
    /// 除输入校验外不返回 `Err`，状态通过 `ReadResult::status` 表达。
    /// 缓存修复在返回前完成，同样受单次调用的超时限制。
    #[instrument(skip(self), level = "debug")]
    pub async fn read(&self, username: &str) -> Result<ReadResult> {
        validate_username(username)?;

        let (cache, relational, wide_column) = tokio::join!(
            self.read_cache(username),
            self.fetch_durable(Source::Relational, self.adapters.relational.as_ref(), username),
            self.fetch_durable(Source::WideColumn, self.adapters.wide_column.as_ref(), username),
        );

        let reconciliation = reconcile(&cache, &relational, &wide_column);
        let repair = self.repair(username, reconciliation.plan).await;

        let result = ReadResult {
            username: username.to_string(),
            cache,
            relational,
            wide_column,
            merged: reconciliation.merged,
            found_in: reconciliation.found_in,
            repair,
            status: reconciliation.status,
        };

        if let Some(divergence) = result.divergence() {
            warn!("Durable stores diverge for {}: {:?}", username, divergence);
        }
        match result.status {
            ReadStatus::Found => debug!("Resolved {} from {:?}", username, result.found_in),
            ReadStatus::NotFound => debug!("User not found: {}", username),
            ReadStatus::Unavailable => warn!(
                "Cannot resolve {}, failed sources: {:?}",
                username,
                result.failed_sources()
            ),
        }

        Ok(result)
    }

    async fn read_cache(&self, username: &str) -> SourceRead {
        // 未配置缓存时等同于缓存未命中
        let Some(cache) = &self.adapters.cache else {
            return SourceRead::Miss;
        };
        let start = Instant::now();
        let result = bounded(Target::Cache, self.settings.adapter_timeout, cache.get(username)).await;
        self.observe(Source::Cache, start, result)
    }

    async fn fetch_durable(
        &self,
        source: Source,
        store: &dyn DurableStore,
        username: &str,
    ) -> SourceRead {
        let start = Instant::now();
        let result = bounded(source.into(), self.settings.adapter_timeout, store.fetch(username)).await;
        self.observe(source, start, result)
    }

    fn observe(&self, source: Source, start: Instant, result: Result<Option<UserRecord>>) -> SourceRead {
        let name = source.to_string();
        self.metrics.record_duration(&name, "read", start.elapsed());
        let label = match &result {
            Ok(Some(_)) => "hit",
            Ok(None) => "miss",
            Err(e) => {
                warn!("Read from {} failed: {}", source, e);
                if e.is_timeout() {
                    "timeout"
                } else {
                    "failed"
                }
            }
        };
        self.metrics.record_request(&name, "read", label);
        result.into()
    }

    async fn repair(&self, username: &str, plan: RepairPlan) -> CacheRepair {
        let Some(cache) = &self.adapters.cache else {
            return CacheRepair::NotNeeded;
        };
        let limit = self.settings.adapter_timeout;

        let (result, done) = match plan {
            RepairPlan::None => return CacheRepair::NotNeeded,
            RepairPlan::Write(record) => (
                bounded(
                    Target::Cache,
                    limit,
                    cache.set(username, &record, self.settings.cache_ttl),
                )
                .await,
                CacheRepair::Written,
            ),
            RepairPlan::Evict => (
                bounded(Target::Cache, limit, cache.delete(username)).await,
                CacheRepair::Evicted,
            ),
        };

        match result {
            Ok(()) => {
                debug!("Cache repaired for {}: {:?}", username, done);
                self.metrics.record_request("cache", "repair", "committed");
                done
            }
            Err(e) => {
                warn!("Cache repair failed for {}: {}", username, e);
                self.metrics.record_request("cache", "repair", "failed");
                CacheRepair::Failed(e.into())
            }
        }
    }
}

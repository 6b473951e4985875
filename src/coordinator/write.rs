//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了写入扇出协调器。
//!
//! 一次写入先并发提交到两个持久化存储，随后写缓存并发布事件。
//! 各目标的结果独立记录，任何目标的失败都不会阻止其他目标被尝试。

use super::{bounded, CoordinatorSettings};
use crate::adapter::{AdapterSet, DurableStore};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::model::{AggregatedWriteResult, Target, UserEvent, UserRecord, WriteOutcome, WriteStatus};
use crate::serialization::{JsonSerializer, Serializer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 写入扇出协调器
#[derive(Debug, Clone)]
pub struct WriteCoordinator {
    adapters: AdapterSet,
    settings: CoordinatorSettings,
    serializer: JsonSerializer,
    metrics: Arc<Metrics>,
}

impl WriteCoordinator {
    pub fn new(adapters: AdapterSet, settings: CoordinatorSettings, metrics: Arc<Metrics>) -> Self {
        Self {
            adapters,
            settings,
            serializer: JsonSerializer::new(),
            metrics,
        }
    }

    /// 将一条记录扇出写入所有已配置的目标
    ///
    /// 只有输入校验失败会返回 `Err`，后端故障都记录在返回的聚合结果中。
    /// 缓存写入和事件发布不依赖持久化存储的结果，总是会被尝试。
    #[instrument(skip(self, record), level = "debug", fields(username = %record.username))]
    pub async fn write(&self, record: &UserRecord) -> Result<AggregatedWriteResult> {
        record.validate()?;

        let (relational, wide_column) = tokio::join!(
            self.upsert_durable(Target::Relational, self.adapters.relational.as_ref(), record),
            self.upsert_durable(Target::WideColumn, self.adapters.wide_column.as_ref(), record),
        );

        let cache = self.write_cache(record).await;
        let publisher = self.publish(record).await;

        let result = AggregatedWriteResult::new(
            record.username.clone(),
            relational,
            wide_column,
            cache,
            publisher,
        );

        match result.overall {
            WriteStatus::FullyCommitted => {
                debug!("Write committed to both durable stores: {}", record.username);
            }
            WriteStatus::PartiallyCommitted => {
                warn!(
                    "Partial write for {}, failed targets: {:?}",
                    record.username,
                    result.failed_targets()
                );
            }
            WriteStatus::Failed => {
                warn!("Write failed on both durable stores: {}", record.username);
            }
        }

        Ok(result)
    }

    async fn upsert_durable(
        &self,
        target: Target,
        store: &dyn DurableStore,
        record: &UserRecord,
    ) -> WriteOutcome {
        let start = Instant::now();
        let result = bounded(target, self.settings.adapter_timeout, store.upsert(record)).await;
        self.observe(target, start, result)
    }

    async fn write_cache(&self, record: &UserRecord) -> WriteOutcome {
        let Some(cache) = &self.adapters.cache else {
            return WriteOutcome::Skipped;
        };
        let start = Instant::now();
        let result = bounded(
            Target::Cache,
            self.settings.adapter_timeout,
            cache.set(&record.username, record, self.settings.cache_ttl),
        )
        .await;
        self.observe(Target::Cache, start, result)
    }

    async fn publish(&self, record: &UserRecord) -> WriteOutcome {
        let Some(publisher) = &self.adapters.publisher else {
            return WriteOutcome::Skipped;
        };
        let start = Instant::now();
        let event = UserEvent::upserted(record.clone());
        let result = match self.serializer.serialize(&event) {
            Ok(payload) => {
                bounded(
                    Target::Publisher,
                    self.settings.adapter_timeout,
                    publisher.publish(&self.settings.topic, payload),
                )
                .await
            }
            Err(e) => Err(e.into_adapter_failure(Target::Publisher)),
        };
        if result.is_ok() {
            debug!(
                "Published event {} for {} on {}",
                event.event_id, record.username, self.settings.topic
            );
        }
        self.observe(Target::Publisher, start, result)
    }

    fn observe(&self, target: Target, start: Instant, result: Result<()>) -> WriteOutcome {
        let name = target.to_string();
        self.metrics.record_duration(&name, "write", start.elapsed());
        match &result {
            Ok(()) => self.metrics.record_request(&name, "write", "committed"),
            Err(e) => {
                let label = if e.is_timeout() { "timeout" } else { "failed" };
                self.metrics.record_request(&name, "write", label);
                warn!("Write to {} failed: {}", target, e);
            }
        }
        result.into()
    }
}

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了扇出服务，负责按配置初始化所有适配器并对外提供读写入口。

use crate::adapter::{AdapterSet, CacheStore, EventPublisher};
use crate::backend::{MemoryCache, RedisCache, RedisPublisher, ScyllaUserStore, SqlUserStore};
use crate::config::{CacheBackendType, Config};
use crate::coordinator::{CoordinatorSettings, ReadCoordinator, WriteCoordinator};
use crate::error::{FanoutError, Result};
use crate::health::{self, HealthReport};
use crate::metrics::Metrics;
use crate::model::{AggregatedWriteResult, ReadResult, UserRecord};
use std::sync::Arc;
use tracing::{info, instrument};

/// 扇出服务
///
/// 持有共享的适配器集合和两个协调器，可在多个任务间并发使用
#[derive(Debug)]
pub struct FanoutService {
    adapters: AdapterSet,
    settings: CoordinatorSettings,
    writer: WriteCoordinator,
    reader: ReadCoordinator,
    metrics: Arc<Metrics>,
}

impl FanoutService {
    /// 以已构建的适配器创建服务
    pub fn new(adapters: AdapterSet, settings: CoordinatorSettings) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            writer: WriteCoordinator::new(adapters.clone(), settings.clone(), metrics.clone()),
            reader: ReadCoordinator::new(adapters.clone(), settings.clone(), metrics.clone()),
            adapters,
            settings,
            metrics,
        }
    }

    /// 按配置连接所有后端并创建服务
    ///
    /// 所有已配置的后端并发连接，任何一个连接失败都会导致启动失败
    #[instrument(skip(config), level = "info")]
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate().map_err(FanoutError::Configuration)?;

        let cache = async {
            let cache: Option<Arc<dyn CacheStore>> = match config.cache.backend {
                CacheBackendType::Redis => Some(Arc::new(RedisCache::connect(&config.cache).await?)),
                CacheBackendType::Memory => Some(Arc::new(MemoryCache::new(config.cache.max_capacity))),
                CacheBackendType::Disabled => None,
            };
            Ok::<_, FanoutError>(cache)
        };
        let publisher = async {
            let publisher: Option<Arc<dyn EventPublisher>> = if config.events.enabled {
                Some(Arc::new(RedisPublisher::connect(&config.events).await?))
            } else {
                None
            };
            Ok::<_, FanoutError>(publisher)
        };

        let (relational, wide_column, cache, publisher) = tokio::try_join!(
            SqlUserStore::connect(&config.relational),
            ScyllaUserStore::connect(&config.wide_column),
            cache,
            publisher,
        )?;

        let mut adapters = AdapterSet::new(Arc::new(relational), Arc::new(wide_column));
        adapters.cache = cache;
        adapters.publisher = publisher;
        info!("Fanout service initialized: {:?}", adapters);

        Ok(Self::new(adapters, CoordinatorSettings::from_config(config)))
    }

    /// 提交一次写入
    pub async fn submit_write(&self, record: UserRecord) -> Result<AggregatedWriteResult> {
        self.writer.write(&record).await
    }

    /// 提交一次读取
    ///
    /// 与 [`ReadCoordinator::read`] 不同，记录不存在或无法判定时返回错误
    pub async fn submit_read(&self, username: &str) -> Result<ReadResult> {
        self.reader.read(username).await?.ensure_found()
    }

    pub fn reader(&self) -> &ReadCoordinator {
        &self.reader
    }

    pub fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    /// 探测所有适配器的健康状态
    pub async fn status(&self) -> HealthReport {
        health::check(&self.adapters, self.settings.adapter_timeout).await
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

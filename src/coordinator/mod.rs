//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了写入扇出和读取协调两个协调器。

pub mod read;
pub mod write;

pub use read::ReadCoordinator;
pub use write::WriteCoordinator;

use crate::config::Config;
use crate::error::{FanoutError, Result};
use crate::model::Target;
use std::future::Future;
use std::time::Duration;

/// 协调器运行参数
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// 单个适配器调用的超时时间
    pub adapter_timeout: Duration,
    /// 缓存过期时间（秒）
    pub cache_ttl: Option<u64>,
    /// 事件发布频道
    pub topic: String,
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            adapter_timeout: config.coordinator.adapter_timeout(),
            cache_ttl: config.cache.ttl_secs,
            topic: config.events.topic.clone(),
        }
    }

    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_millis(3000),
            cache_ttl: Some(3600),
            topic: "userExchange".to_string(),
        }
    }
}

/// 在超时上限内等待一次适配器调用
///
/// 超时记为 `Timeout`，其余错误折叠为带目标标识的 `AdapterFailure`。
/// 超时只停止等待，不保证后端取消已发出的操作。
pub(crate) async fn bounded<T, F>(target: Target, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|e| e.into_adapter_failure(target)),
        Err(_) => Err(FanoutError::Timeout {
            target,
            after_ms: limit.as_millis() as u64,
        }),
    }
}

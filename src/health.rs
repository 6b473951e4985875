//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了各适配器的健康探测。

use crate::adapter::AdapterSet;
use crate::error::FanoutError;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// 单个适配器的探测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum ProbeStatus {
    Up,
    Down(String),
    NotConfigured,
}

impl ProbeStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, ProbeStatus::Up)
    }
}

/// 健康报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub relational: ProbeStatus,
    pub wide_column: ProbeStatus,
    pub cache: ProbeStatus,
    pub publisher: ProbeStatus,
}

impl HealthReport {
    /// 两个持久化存储都可用时才视为就绪
    pub fn is_ready(&self) -> bool {
        self.relational.is_up() && self.wide_column.is_up()
    }
}

async fn probe<F>(limit: Duration, ping: F) -> ProbeStatus
where
    F: Future<Output = Result<(), FanoutError>>,
{
    match timeout(limit, ping).await {
        Ok(Ok(())) => ProbeStatus::Up,
        Ok(Err(e)) => ProbeStatus::Down(e.to_string()),
        Err(_) => ProbeStatus::Down(format!("ping timed out after {}ms", limit.as_millis())),
    }
}

/// 并发探测所有适配器
pub async fn check(adapters: &AdapterSet, limit: Duration) -> HealthReport {
    let cache = async {
        match &adapters.cache {
            Some(cache) => probe(limit, cache.ping()).await,
            None => ProbeStatus::NotConfigured,
        }
    };
    let publisher = async {
        match &adapters.publisher {
            Some(publisher) => probe(limit, publisher.ping()).await,
            None => ProbeStatus::NotConfigured,
        }
    };
    let (relational, wide_column, cache, publisher) = tokio::join!(
        probe(limit, adapters.relational.ping()),
        probe(limit, adapters.wide_column.ping()),
        cache,
        publisher,
    );
    HealthReport {
        relational,
        wide_column,
        cache,
        publisher,
    }
}

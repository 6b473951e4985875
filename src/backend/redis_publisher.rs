//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis PUBLISH的事件发布适配器。

use crate::adapter::EventPublisher;
use crate::backend::redis_provider::open_connection;
use crate::config::EventsConfig;
use crate::error::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

/// Redis事件发布者
///
/// 发布是"发出即忘"的，没有订阅者时消息直接丢弃
#[derive(Clone)]
pub struct RedisPublisher {
    manager: ConnectionManager,
}

impl std::fmt::Debug for RedisPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedisPublisher")
    }
}

impl RedisPublisher {
    #[instrument(skip(config), level = "info", name = "init_redis_publisher")]
    pub async fn connect(config: &EventsConfig) -> Result<Self> {
        let (_client, manager) =
            open_connection(&config.url, config.enable_tls, config.connect_timeout_ms).await?;
        Ok(Self::new(manager))
    }

    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventPublisher for RedisPublisher {
    #[instrument(skip(self, payload), level = "debug", fields(payload_len = payload.len()))]
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let mut conn = self.manager.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        debug!("Published to {}, receivers={}", topic, receivers);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

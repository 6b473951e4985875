//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内适配器：moka缓存、内存存储和广播发布者。
//!
//! 用于单机部署、测试和基准测试，不依赖任何外部服务。

use crate::adapter::{CacheStore, DurableStore, EventPublisher, ReceivedSink};
use crate::error::{FanoutError, Result};
use crate::model::UserRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

/// 进程内缓存
///
/// 基于moka，每个条目带有独立的过期时间
#[derive(Clone)]
pub struct MemoryCache {
    // 值: (记录, 过期时间)
    cache: Cache<String, (UserRecord, Option<Instant>)>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl MemoryCache {
    /// 创建进程内缓存
    ///
    /// # 参数
    ///
    /// * `max_capacity` - 最大条目数
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    #[instrument(skip(self, record), level = "debug")]
    async fn set(&self, username: &str, record: &UserRecord, ttl: Option<u64>) -> Result<()> {
        let expire_at = ttl.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.cache
            .insert(username.to_string(), (record.clone(), expire_at))
            .await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        match self.cache.get(username).await {
            Some((record, expire_at)) => {
                if let Some(expire_time) = expire_at {
                    if Instant::now() >= expire_time {
                        self.cache.remove(username).await;
                        debug!("Memory cache entry expired: {}", username);
                        return Ok(None);
                    }
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, username: &str) -> Result<()> {
        self.cache.remove(username).await;
        Ok(())
    }
}

/// 进程内持久化存储替身
///
/// 不落盘，进程退出后数据丢失
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: DashMap<String, UserRecord>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接删除一条记录，不经过协调器
    pub fn remove(&self, username: &str) -> Option<UserRecord> {
        self.records.remove(username).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryUserStore {
    async fn upsert(&self, record: &UserRecord) -> Result<()> {
        self.records.insert(record.username.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.records.get(username).map(|r| r.value().clone()))
    }
}

/// 进程内已接收记录
#[derive(Debug, Default)]
pub struct MemoryReceivedSink {
    received: DashMap<String, ()>,
}

impl MemoryReceivedSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceivedSink for MemoryReceivedSink {
    async fn record_received(&self, username: &str) -> Result<()> {
        self.received.insert(username.to_string(), ());
        Ok(())
    }

    async fn list_received(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.received.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}

/// 广播消息：(频道, 负载)
pub type BroadcastMessage = (String, Vec<u8>);

/// 基于tokio广播通道的进程内发布者
///
/// 与Redis发布语义一致：没有订阅者时消息被丢弃，发布仍然成功
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 订阅之后发布的所有消息
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if self.sender.receiver_count() == 0 {
            debug!("No subscribers on {}, event dropped", topic);
            return Ok(());
        }
        self.sender
            .send((topic.to_string(), payload))
            .map(|_| ())
            .map_err(|e| FanoutError::Backend(format!("broadcast send failed: {}", e)))
    }
}

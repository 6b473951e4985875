//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了协调层所依赖的后端能力接口。
//!
//! 协调器只通过这些接口访问后端，具体实现在 `backend` 模块中，
//! 测试中可以用任意替身替换。

use crate::error::Result;
use crate::model::UserRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// 持久化存储接口
///
/// 关系型存储和宽列存储各有一个实例，两者语义相同：
/// `upsert` 是整条记录的覆盖写入，不存在部分字段更新。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// 插入或覆盖一条用户记录
    async fn upsert(&self, record: &UserRecord) -> Result<()>;

    /// 按用户名读取记录，不存在时返回None
    async fn fetch(&self, username: &str) -> Result<Option<UserRecord>>;

    /// 检查连接是否正常
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// 缓存接口
///
/// 不提供任何持久性保证，缓存项随时可能被宿主驱逐
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 写入缓存项
    ///
    /// # 参数
    ///
    /// * `username` - 用户名
    /// * `record` - 用户记录
    /// * `ttl` - 过期时间（秒），None表示不过期
    async fn set(&self, username: &str, record: &UserRecord, ttl: Option<u64>) -> Result<()>;

    /// 读取缓存项
    async fn get(&self, username: &str) -> Result<Option<UserRecord>>;

    /// 删除缓存项
    async fn delete(&self, username: &str) -> Result<()>;

    /// 检查连接是否正常
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// 事件发布接口
///
/// 最多一次投递，发布方不等待订阅方确认
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 向频道发布负载
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// 检查连接是否正常
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// 已接收事件的记录接口，由下游订阅者使用
#[async_trait]
pub trait ReceivedSink: Send + Sync {
    /// 记录收到的用户名，重复记录是幂等的
    async fn record_received(&self, username: &str) -> Result<()>;

    /// 列出所有收到的用户名
    async fn list_received(&self) -> Result<Vec<String>>;
}

/// 协调器共享的适配器集合
///
/// 构造后不可变，可在多个请求之间并发共享
#[derive(Clone)]
pub struct AdapterSet {
    pub relational: Arc<dyn DurableStore>,
    pub wide_column: Arc<dyn DurableStore>,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub publisher: Option<Arc<dyn EventPublisher>>,
}

impl AdapterSet {
    /// 以两个持久化存储创建适配器集合
    pub fn new(relational: Arc<dyn DurableStore>, wide_column: Arc<dyn DurableStore>) -> Self {
        Self {
            relational,
            wide_column,
            cache: None,
            publisher: None,
        }
    }

    /// 设置缓存适配器
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 设置事件发布器
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSet")
            .field("cache", &self.cache.is_some())
            .field("publisher", &self.publisher.is_some())
            .finish()
    }
}

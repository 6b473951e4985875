//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存适配器。

use crate::adapter::CacheStore;
use crate::backend::redis_provider::open_connection;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::model::UserRecord;
use crate::serialization::{JsonSerializer, Serializer};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

/// Redis缓存适配器
///
/// 缓存键为 `<key_prefix><username>`，值为用户记录的 JSON
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    key_prefix: String,
    serializer: JsonSerializer,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisCache {
    /// 按配置连接Redis
    #[instrument(skip(config), level = "info", name = "init_redis_cache")]
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let (_client, manager) =
            open_connection(&config.url, config.enable_tls, config.connect_timeout_ms).await?;
        Ok(Self::new(manager, config.key_prefix.clone()))
    }

    pub fn new(manager: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            manager,
            key_prefix: key_prefix.into(),
            serializer: JsonSerializer::new(),
        }
    }

    fn key(&self, username: &str) -> String {
        format!("{}{}", self.key_prefix, username)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    #[instrument(skip(self, record), level = "debug")]
    async fn set(&self, username: &str, record: &UserRecord, ttl: Option<u64>) -> Result<()> {
        let key = self.key(username);
        let value = self.serializer.serialize(record)?;
        let mut conn = self.manager.clone();
        debug!("Redis SET key={}, ttl={:?}", key, ttl);
        match ttl {
            Some(ttl) => {
                let _: () = redis::cmd("SET")
                    .arg(&key)
                    .arg(value)
                    .arg("EX")
                    .arg(ttl)
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = redis::cmd("SET")
                    .arg(&key)
                    .arg(value)
                    .query_async(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.key(username))
            .query_async(&mut conn)
            .await?;
        match value {
            Some(bytes) => Ok(Some(self.serializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, username: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.key(username))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

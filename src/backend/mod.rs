//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了各适配器接口的具体后端实现。

pub mod memory;
pub mod redis_cache;
pub mod redis_provider;
pub mod redis_publisher;
pub mod scylla_store;
pub mod sql_store;

pub use memory::{BroadcastPublisher, MemoryCache, MemoryReceivedSink, MemoryUserStore};
pub use redis_cache::RedisCache;
pub use redis_publisher::RedisPublisher;
pub use scylla_store::ScyllaUserStore;
pub use sql_store::SqlUserStore;

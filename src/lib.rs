//! oxfanout - 用户记录写入扇出与读取协调库
//!
//! 一次写入并发提交到关系型存储和宽列存储，随后更新缓存并发布事件；
//! 一次读取并发查询三个数据源，合并出权威值并修复缓存。
//! 部分失败会被逐目标记录，而不是被吞掉或导致整体失败。

#![doc(html_root_url = "https://docs.rs/oxfanout/0.1.0")]

pub mod adapter;
pub mod backend;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod metrics;
pub mod model;
pub mod serialization;
pub mod service;
pub mod subscriber;
pub mod telemetry;
pub mod utils;

// Re-export commonly used items
pub use adapter::{AdapterSet, CacheStore, DurableStore, EventPublisher, ReceivedSink};
pub use config::Config;
pub use coordinator::{CoordinatorSettings, ReadCoordinator, WriteCoordinator};
pub use error::{FanoutError, Result};
pub use model::{
    AggregatedWriteResult, CacheRepair, ReadResult, ReadStatus, Source, SourceRead, Target,
    UserEvent, UserRecord, WriteOutcome, WriteStatus,
};
pub use service::FanoutService;

/// oxfanout 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了扇出协调层的错误类型和处理机制。

use crate::model::{Source, Target};
use thiserror::Error;

/// 扇出系统错误类型枚举
///
/// 前五个变体是协调层的错误分类，其余变体承载各后端客户端的底层错误，
/// 由适配器产生，在协调层边界被折叠为 `AdapterFailure` 或 `Timeout`。
#[derive(Error, Debug)]
pub enum FanoutError {
    /// 请求格式错误，在产生任何副作用之前被拒绝
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 单个后端调用失败（网络、约束冲突等）
    #[error("{target} adapter failed: {cause}")]
    AdapterFailure { target: Target, cause: String },

    /// 后端调用超出了等待上限
    #[error("{target} adapter timed out after {after_ms}ms")]
    Timeout { target: Target, after_ms: u64 },

    /// 所有数据源均成功应答，且都不包含该键
    #[error("User '{0}' not found in any store")]
    NotFound(String),

    /// 数据源不可达，无法断言记录不存在
    #[error("User '{username}' could not be resolved, unreachable sources: {failed:?}")]
    Unavailable {
        username: String,
        failed: Vec<Source>,
    },

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Sea-ORM数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 宽列存储（Cassandra/Scylla）错误
    #[error("Wide-column store error: {0}")]
    WideColumn(String),

    /// 后端错误
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FanoutError {
    /// 将适配器内部错误折叠为带目标标识的失败
    pub fn into_adapter_failure(self, target: Target) -> Self {
        match self {
            err @ (FanoutError::AdapterFailure { .. } | FanoutError::Timeout { .. }) => err,
            other => FanoutError::AdapterFailure {
                target,
                cause: other.to_string(),
            },
        }
    }

    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, FanoutError::Timeout { .. })
    }
}

impl From<serde_json::Error> for FanoutError {
    fn from(err: serde_json::Error) -> Self {
        FanoutError::Serialization(err.to_string())
    }
}

/// 扇出操作结果类型别名
pub type Result<T> = std::result::Result<T, FanoutError>;

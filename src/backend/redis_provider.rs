//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存和事件发布共用的Redis连接建立逻辑。

use crate::error::{FanoutError, Result};
use crate::utils::redaction::redact_connection_string;
use redis::{aio::ConnectionManager, Client};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::{timeout, Duration};
use tracing::info;

/// 将 redis:// 改写为 rediss://，已经是 TLS 地址时保持不变
pub(crate) fn effective_url(url: &str, enable_tls: bool) -> String {
    if enable_tls && url.starts_with("redis://") {
        url.replacen("redis://", "rediss://", 1)
    } else {
        url.to_string()
    }
}

/// 打开Redis客户端并在超时内建立连接管理器
///
/// 连接管理器自带断线重连，可以克隆后在多个任务间共享
pub async fn open_connection(
    url: &SecretString,
    enable_tls: bool,
    connect_timeout_ms: u64,
) -> Result<(Client, ConnectionManager)> {
    let connection_string = effective_url(url.expose_secret(), enable_tls);
    let redacted = redact_connection_string(&connection_string);

    let client = Client::open(connection_string.as_str())?;
    let manager = match timeout(
        Duration::from_millis(connect_timeout_ms),
        client.get_connection_manager(),
    )
    .await
    {
        Ok(res) => res?,
        Err(_) => {
            return Err(FanoutError::Backend(format!(
                "Redis connection timed out after {}ms. Target: {}",
                connect_timeout_ms, redacted
            )));
        }
    };
    info!("Connected to Redis: {}", redacted);
    Ok((client, manager))
}

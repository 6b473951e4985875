//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志和链路追踪的初始化。

use crate::config::TelemetryConfig;
use crate::error::{FanoutError, Result};
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// 初始化全局 tracing subscriber
///
/// 过滤规则优先取 `RUST_LOG`，否则使用配置中的 `log_filter`。
/// 启用 `enable_otel` 时额外挂载 OpenTelemetry 层；未配置导出器时 span 不会离开进程。
///
/// 应在进程启动时调用一次，重复调用返回 `Configuration` 错误。
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| FanoutError::Configuration(format!("invalid log filter: {}", e)))?;

    let otel = if config.enable_otel {
        let provider = SdkTracerProvider::builder().build();
        global::set_tracer_provider(provider.clone());
        let tracer = provider.tracer(config.service_name.clone());
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(otel);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| FanoutError::Configuration(e.to_string()))
}

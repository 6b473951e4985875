//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了协调层的指标收集和监控功能。

use dashmap::DashMap;
use std::fmt::Write;
use std::time::Duration;
use tracing::{span, Level};

/// 指标收集器
///
/// 由服务持有并注入协调器，计数器按 `target:op:result` 分组
#[derive(Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "target:op:result"
    requests_total: DashMap<String, u64>,
    /// 操作耗时（累积秒数与次数）
    /// key: "target:op"
    operation_duration: DashMap<String, (f64, u64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `target` - 目标（relational/wide-column/cache/publisher）
    /// * `op` - 操作类型（write/read/repair）
    /// * `result` - 操作结果（committed/failed/hit/miss...）
    pub fn record_request(&self, target: &str, op: &str, result: &str) {
        let span = span!(Level::TRACE, "fanout_request", target, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}", target, op, result);
        *self.requests_total.entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, target: &str, op: &str, duration: Duration) {
        let key = format!("{}:{}", target, op);
        let mut entry = self.operation_duration.entry(key).or_insert((0.0, 0));
        entry.0 += duration.as_secs_f64();
        entry.1 += 1;
    }

    /// 读取某个计数器的当前值
    pub fn request_count(&self, target: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}", target, op, result);
        self.requests_total.get(&key).map(|v| *v).unwrap_or(0)
    }

    /// 将所有指标格式化为 Prometheus 文本格式
    pub fn render(&self) -> String {
        let mut requests: Vec<(String, u64)> = self
            .requests_total
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        requests.sort();

        let mut durations: Vec<(String, (f64, u64))> = self
            .operation_duration
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        durations.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = String::new();
        for (key, count) in requests {
            let mut parts = key.splitn(3, ':');
            if let (Some(target), Some(op), Some(result)) = (parts.next(), parts.next(), parts.next())
            {
                let _ = writeln!(
                    output,
                    "fanout_requests_total{{target=\"{}\", op=\"{}\", result=\"{}\"}} {}",
                    target, op, result, count
                );
            }
        }
        for (key, (total, count)) in durations {
            if let Some((target, op)) = key.split_once(':') {
                let _ = writeln!(
                    output,
                    "fanout_operation_duration_seconds_sum{{target=\"{}\", op=\"{}\"}} {}",
                    target, op, total
                );
                let _ = writeln!(
                    output,
                    "fanout_operation_duration_seconds_count{{target=\"{}\", op=\"{}\"}} {}",
                    target, op, count
                );
            }
        }
        output
    }
}

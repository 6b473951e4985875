//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了用户记录以及读写协调结果的数据模型。

use crate::error::{FanoutError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// 用户名的最大长度（字节），不超过关系表 `user_name VARCHAR(255)` 列宽
pub const MAX_USERNAME_LEN: usize = 255;

/// 用户记录
///
/// 以 `username` 为身份键，其余属性对协调层不透明。
/// 序列化为扁平 JSON 对象：`{"username": ..., <attributes>...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// 用户名（唯一身份键）
    pub username: String,
    /// 附加属性
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl UserRecord {
    /// 创建只有用户名的记录
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// 追加一个属性
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 由存储行还原记录
    ///
    /// # 参数
    ///
    /// * `username` - 主键列
    /// * `attributes_json` - 属性列（JSON文本）
    pub fn from_row(username: String, attributes_json: &str) -> Result<Self> {
        let attributes = if attributes_json.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(attributes_json)?
        };
        Ok(Self {
            username,
            attributes,
        })
    }

    /// 属性列的 JSON 文本
    pub fn attributes_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.attributes)?)
    }

    /// 校验记录，失败时返回 `InvalidInput`
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        if self.attributes.contains_key("username") {
            return Err(FanoutError::InvalidInput(
                "attribute name 'username' is reserved".to_string(),
            ));
        }
        Ok(())
    }
}

/// 校验用户名
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(FanoutError::InvalidInput(
            "username must not be empty".to_string(),
        ));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(FanoutError::InvalidInput(format!(
            "username exceeds {} bytes",
            MAX_USERNAME_LEN
        )));
    }
    Ok(())
}

/// 可读数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Cache,
    Relational,
    WideColumn,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Cache => "cache",
            Source::Relational => "relational",
            Source::WideColumn => "wide-column",
        })
    }
}

/// 写入目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Relational,
    WideColumn,
    Cache,
    Publisher,
}

impl From<Source> for Target {
    fn from(source: Source) -> Self {
        match source {
            Source::Cache => Target::Cache,
            Source::Relational => Target::Relational,
            Source::WideColumn => Target::WideColumn,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Relational => "relational",
            Target::WideColumn => "wide-column",
            Target::Cache => "cache",
            Target::Publisher => "publisher",
        })
    }
}

/// 失败原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// 超出等待上限
    Timeout { after_ms: u64 },
    /// 后端返回错误
    Adapter { message: String },
}

impl From<FanoutError> for FailureReason {
    fn from(err: FanoutError) -> Self {
        match err {
            FanoutError::Timeout { after_ms, .. } => FailureReason::Timeout { after_ms },
            FanoutError::AdapterFailure { cause, .. } => FailureReason::Adapter { message: cause },
            other => FailureReason::Adapter {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            FailureReason::Adapter { message } => f.write_str(message),
        }
    }
}

/// 单个目标的写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Committed,
    Failed(FailureReason),
    /// 目标未配置
    Skipped,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WriteOutcome::Failed(_))
    }
}

impl From<Result<()>> for WriteOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => WriteOutcome::Committed,
            Err(e) => WriteOutcome::Failed(e.into()),
        }
    }
}

/// 写入的总体状态，仅由两个持久化目标决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    FullyCommitted,
    PartiallyCommitted,
    Failed,
}

impl WriteStatus {
    fn from_durable(relational: &WriteOutcome, wide_column: &WriteOutcome) -> Self {
        match (relational.is_committed(), wide_column.is_committed()) {
            (true, true) => WriteStatus::FullyCommitted,
            (false, false) => WriteStatus::Failed,
            _ => WriteStatus::PartiallyCommitted,
        }
    }
}

/// 聚合写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedWriteResult {
    pub username: String,
    pub relational: WriteOutcome,
    pub wide_column: WriteOutcome,
    pub cache: WriteOutcome,
    pub publisher: WriteOutcome,
    pub overall: WriteStatus,
}

impl AggregatedWriteResult {
    pub fn new(
        username: String,
        relational: WriteOutcome,
        wide_column: WriteOutcome,
        cache: WriteOutcome,
        publisher: WriteOutcome,
    ) -> Self {
        let overall = WriteStatus::from_durable(&relational, &wide_column);
        Self {
            username,
            relational,
            wide_column,
            cache,
            publisher,
            overall,
        }
    }

    /// 获取指定目标的写入结果
    pub fn outcome(&self, target: Target) -> &WriteOutcome {
        match target {
            Target::Relational => &self.relational,
            Target::WideColumn => &self.wide_column,
            Target::Cache => &self.cache,
            Target::Publisher => &self.publisher,
        }
    }

    /// 写入失败的目标列表
    pub fn failed_targets(&self) -> Vec<Target> {
        [
            Target::Relational,
            Target::WideColumn,
            Target::Cache,
            Target::Publisher,
        ]
        .into_iter()
        .filter(|t| self.outcome(*t).is_failed())
        .collect()
    }
}

/// 单个数据源的读取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRead {
    Hit(UserRecord),
    Miss,
    Failed(FailureReason),
}

impl SourceRead {
    pub fn value(&self) -> Option<&UserRecord> {
        match self {
            SourceRead::Hit(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, SourceRead::Miss)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceRead::Failed(_))
    }
}

impl From<Result<Option<UserRecord>>> for SourceRead {
    fn from(result: Result<Option<UserRecord>>) -> Self {
        match result {
            Ok(Some(record)) => SourceRead::Hit(record),
            Ok(None) => SourceRead::Miss,
            Err(e) => SourceRead::Failed(e.into()),
        }
    }
}

/// 读取过程中对缓存执行的修复动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheRepair {
    NotNeeded,
    /// 以持久化存储的值回写缓存
    Written,
    /// 持久化存储均确认不存在，删除缓存项
    Evicted,
    Failed(FailureReason),
}

/// 读取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Found,
    NotFound,
    Unavailable,
}

/// 持久化存储之间的分歧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    /// 一个持久化存储有记录，另一个确认没有
    MissingIn(Source),
    /// 两个持久化存储都有记录但内容不同
    ContentMismatch,
}

/// 读取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    pub username: String,
    pub cache: SourceRead,
    pub relational: SourceRead,
    pub wide_column: SourceRead,
    /// 合并后的记录
    pub merged: Option<UserRecord>,
    /// 返回了值的数据源
    pub found_in: BTreeSet<Source>,
    pub repair: CacheRepair,
    pub status: ReadStatus,
}

impl ReadResult {
    pub fn source(&self, source: Source) -> &SourceRead {
        match source {
            Source::Cache => &self.cache,
            Source::Relational => &self.relational,
            Source::WideColumn => &self.wide_column,
        }
    }

    /// 读取失败的数据源
    pub fn failed_sources(&self) -> Vec<Source> {
        [Source::Cache, Source::Relational, Source::WideColumn]
            .into_iter()
            .filter(|s| self.source(*s).is_failed())
            .collect()
    }

    /// 检测持久化存储之间的分歧
    ///
    /// 只有在另一方成功应答"不存在"时才视为缺失，失败的数据源状态未知
    pub fn divergence(&self) -> Option<Divergence> {
        match (&self.relational, &self.wide_column) {
            (SourceRead::Hit(a), SourceRead::Hit(b)) if a != b => Some(Divergence::ContentMismatch),
            (SourceRead::Hit(_), SourceRead::Miss) => {
                Some(Divergence::MissingIn(Source::WideColumn))
            }
            (SourceRead::Miss, SourceRead::Hit(_)) => {
                Some(Divergence::MissingIn(Source::Relational))
            }
            _ => None,
        }
    }

    /// 将 `NotFound` 和 `Unavailable` 状态转换为对应的错误
    pub fn ensure_found(self) -> Result<Self> {
        match self.status {
            ReadStatus::Found => Ok(self),
            ReadStatus::NotFound => Err(FanoutError::NotFound(self.username)),
            ReadStatus::Unavailable => {
                let failed = self.failed_sources();
                Err(FanoutError::Unavailable {
                    username: self.username,
                    failed,
                })
            }
        }
    }
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserUpserted,
}

/// 发布到通知频道的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    /// 事件ID，供订阅方去重
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: EventKind,
    pub record: UserRecord,
}

impl UserEvent {
    pub fn upserted(record: UserRecord) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind: EventKind::UserUpserted,
            record,
        }
    }
}

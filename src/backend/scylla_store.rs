//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Scylla/Cassandra的宽列存储适配器。
//!
//! 表结构：`<keyspace>.<table>(user_name text PRIMARY KEY, attributes text)`。
//! CQL 的 INSERT 本身就是覆盖写入，无需单独的 upsert 语句。

use crate::adapter::DurableStore;
use crate::config::WideColumnConfig;
use crate::error::{FanoutError, Result};
use crate::model::UserRecord;
use async_trait::async_trait;
use scylla::prepared_statement::PreparedStatement;
use scylla::{Session, SessionBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, instrument};

fn wide_column_error(err: impl std::fmt::Display) -> FanoutError {
    FanoutError::WideColumn(err.to_string())
}

/// 宽列用户存储
///
/// 语句在连接时预编译，之后每次调用只发送参数
pub struct ScyllaUserStore {
    session: Session,
    insert: PreparedStatement,
    select: PreparedStatement,
}

impl std::fmt::Debug for ScyllaUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaUserStore")
            .field("insert", &self.insert.get_statement())
            .finish()
    }
}

impl ScyllaUserStore {
    /// 连接集群并预编译读写语句
    #[instrument(skip(config), level = "info", name = "init_wide_column_store", fields(nodes = ?config.nodes))]
    pub async fn connect(config: &WideColumnConfig) -> Result<Self> {
        let mut builder = SessionBuilder::new()
            .known_nodes(&config.nodes)
            .connection_timeout(Duration::from_millis(config.connect_timeout_ms));
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder = builder.user(user.as_str(), password.expose_secret());
        }

        let session = builder.build().await.map_err(wide_column_error)?;
        let qualified = format!("{}.{}", config.keyspace, config.table);

        let insert = session
            .prepare(format!(
                "INSERT INTO {} (user_name, attributes) VALUES (?, ?)",
                qualified
            ))
            .await
            .map_err(wide_column_error)?;
        let select = session
            .prepare(format!(
                "SELECT user_name, attributes FROM {} WHERE user_name = ?",
                qualified
            ))
            .await
            .map_err(wide_column_error)?;

        info!("Connected to wide-column store, table {}", qualified);
        Ok(Self {
            session,
            insert,
            select,
        })
    }
}

#[async_trait]
impl DurableStore for ScyllaUserStore {
    #[instrument(skip(self, record), level = "debug", fields(username = %record.username))]
    async fn upsert(&self, record: &UserRecord) -> Result<()> {
        let attributes = record.attributes_json()?;
        self.session
            .execute_unpaged(&self.insert, (record.username.as_str(), attributes.as_str()))
            .await
            .map_err(wide_column_error)?;
        debug!("Wide-column upsert: {}", record.username);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, username: &str) -> Result<Option<UserRecord>> {
        let result = self
            .session
            .execute_unpaged(&self.select, (username,))
            .await
            .map_err(wide_column_error)?;
        let row = result
            .maybe_first_row_typed::<(String, Option<String>)>()
            .map_err(wide_column_error)?;
        match row {
            Some((name, attributes)) => Ok(Some(UserRecord::from_row(
                name,
                attributes.as_deref().unwrap_or_default(),
            )?)),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.session
            .query_unpaged("SELECT release_version FROM system.local", ())
            .await
            .map_err(wide_column_error)?;
        Ok(())
    }
}

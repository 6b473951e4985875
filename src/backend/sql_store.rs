//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Sea-ORM的关系型存储适配器。
//!
//! 支持 PostgreSQL、MySQL 和 SQLite，方言由连接推断。
//! 表结构：`<table>(user_name VARCHAR(255) PRIMARY KEY, attributes TEXT NOT NULL)`，
//! 已接收表：`<received_table>(user_name VARCHAR(255) PRIMARY KEY)`。

use crate::adapter::{DurableStore, ReceivedSink};
use crate::config::RelationalConfig;
use crate::error::Result;
use crate::model::UserRecord;
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement,
    Value,
};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// 关系型用户存储
#[derive(Debug, Clone)]
pub struct SqlUserStore {
    connection: DatabaseConnection,
    backend: DatabaseBackend,
    table: String,
    received_table: String,
}

impl SqlUserStore {
    /// 按配置建立连接池
    #[instrument(skip(config), level = "info", name = "init_relational_store")]
    pub async fn connect(config: &RelationalConfig) -> Result<Self> {
        let url = config.url.expose_secret();
        let mut opt = ConnectOptions::new(url.to_string());
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .sqlx_logging(false);

        let connection = Database::connect(opt).await?;
        info!("Connected to relational store: {}", redact_connection_string(url));
        Ok(Self::new(connection, &config.table, &config.received_table))
    }

    /// 使用已有连接创建存储
    pub fn new(connection: DatabaseConnection, table: &str, received_table: &str) -> Self {
        let backend = connection.get_database_backend();
        Self {
            connection,
            backend,
            table: table.to_string(),
            received_table: received_table.to_string(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// 建表语句，供运维或测试预先执行
    pub fn schema_statements(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {} (user_name VARCHAR(255) PRIMARY KEY, attributes TEXT NOT NULL)",
                self.table
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (user_name VARCHAR(255) PRIMARY KEY)",
                self.received_table
            ),
        ]
    }

    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackend::Postgres => format!("${}", index),
            _ => "?".to_string(),
        }
    }

    fn upsert_sql(&self) -> String {
        let (p1, p2) = (self.placeholder(1), self.placeholder(2));
        match self.backend {
            DatabaseBackend::Postgres | DatabaseBackend::Sqlite => format!(
                "INSERT INTO {} (user_name, attributes) VALUES ({}, {}) \
                 ON CONFLICT (user_name) DO UPDATE SET attributes = excluded.attributes",
                self.table, p1, p2
            ),
            _ => format!(
                "INSERT INTO {} (user_name, attributes) VALUES ({}, {}) \
                 ON DUPLICATE KEY UPDATE attributes = VALUES(attributes)",
                self.table, p1, p2
            ),
        }
    }

    fn insert_received_sql(&self) -> String {
        let p1 = self.placeholder(1);
        match self.backend {
            DatabaseBackend::Postgres | DatabaseBackend::Sqlite => format!(
                "INSERT INTO {} (user_name) VALUES ({}) ON CONFLICT (user_name) DO NOTHING",
                self.received_table, p1
            ),
            _ => format!(
                "INSERT IGNORE INTO {} (user_name) VALUES ({})",
                self.received_table, p1
            ),
        }
    }

    fn statement(&self, sql: String, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.backend, sql, values)
    }
}

#[async_trait]
impl DurableStore for SqlUserStore {
    #[instrument(skip(self, record), level = "debug", fields(username = %record.username))]
    async fn upsert(&self, record: &UserRecord) -> Result<()> {
        let attributes = record.attributes_json()?;
        let stmt = self.statement(
            self.upsert_sql(),
            vec![record.username.clone().into(), attributes.into()],
        );
        self.connection.execute(stmt).await?;
        debug!("Relational upsert: {}", record.username);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, username: &str) -> Result<Option<UserRecord>> {
        let sql = format!(
            "SELECT user_name, attributes FROM {} WHERE user_name = {}",
            self.table,
            self.placeholder(1)
        );
        let row = self
            .connection
            .query_one(self.statement(sql, vec![username.into()]))
            .await?;
        match row {
            Some(row) => {
                let name = row.try_get::<String>("", "user_name")?;
                let attributes = row.try_get::<String>("", "attributes")?;
                Ok(Some(UserRecord::from_row(name, &attributes)?))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.connection.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl ReceivedSink for SqlUserStore {
    async fn record_received(&self, username: &str) -> Result<()> {
        let stmt = self.statement(self.insert_received_sql(), vec![username.into()]);
        self.connection.execute(stmt).await?;
        Ok(())
    }

    async fn list_received(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT user_name FROM {} ORDER BY user_name",
            self.received_table
        );
        let rows = self
            .connection
            .query_all(Statement::from_string(self.backend, sql))
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String>("", "user_name").map_err(Into::into))
            .collect()
    }
}

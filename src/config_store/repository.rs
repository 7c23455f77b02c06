//! SQLite-backed ConfigStore
//!
//! One row per `(section, key)`; values are stored as JSON text.

use super::{ConfigStore, SectionMap, StoreOp};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS config (
        section TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT,
        PRIMARY KEY (section, key)
    )
"#;

const UPSERT: &str = r#"
    INSERT INTO config (section, key, value) VALUES (?, ?, ?)
    ON CONFLICT(section, key) DO UPDATE SET value = excluded.value
"#;

/// ConfigStore repository on SQLite
#[derive(Clone)]
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    /// Open (creating if needed) the database at `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // In-memory databases are per connection
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and make sure the table exists
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        tracing::debug!("ConfigStore table ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn decode(section: &str, key: &str, raw: Option<String>) -> Result<Value> {
        match raw {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                Error::Store(format!("{}.{} holds invalid JSON: {}", section, key, e))
            }),
            None => Ok(Value::Null),
        }
    }

    async fn apply_in(tx: &mut Transaction<'_, Sqlite>, op: &StoreOp) -> Result<()> {
        match op {
            StoreOp::Set {
                section,
                key,
                value,
            } => {
                sqlx::query(UPSERT)
                    .bind(section)
                    .bind(key)
                    .bind(serde_json::to_string(value)?)
                    .execute(&mut **tx)
                    .await?;
            }
            StoreOp::DeleteSection { section } => {
                sqlx::query("DELETE FROM config WHERE section = ?")
                    .bind(section)
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get(&self, section: &str, key: &str) -> Result<Option<Value>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT value FROM config WHERE section = ? AND key = ?")
                .bind(section)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(raw,)| Self::decode(section, key, raw)).transpose()
    }

    async fn set(&self, section: &str, key: &str, value: Value) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(section)
            .bind(key)
            .bind(serde_json::to_string(&value)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_section(&self, section: &str) -> Result<SectionMap> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT key, value FROM config WHERE section = ? ORDER BY key")
                .bind(section)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(key, raw)| -> Result<(String, Value)> {
                let value = Self::decode(section, &key, raw)?;
                Ok((key, value))
            })
            .collect()
    }

    async fn all_sections(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT section FROM config ORDER BY section")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(section,)| section).collect())
    }

    async fn delete_section(&self, section: &str) -> Result<()> {
        sqlx::query("DELETE FROM config WHERE section = ?")
            .bind(section)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Every statement autocommits, nothing is pending
    async fn save(&self) -> Result<()> {
        Ok(())
    }

    /// The whole batch commits or none of it does
    async fn apply(&self, ops: &[StoreOp]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for op in ops {
            Self::apply_in(&mut tx, op).await?;
        }
        tx.commit().await?;
        tracing::debug!(ops = ops.len(), "ConfigStore batch committed");
        Ok(())
    }
}

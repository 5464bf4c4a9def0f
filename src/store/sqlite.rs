use async_trait::async_trait;
use rusqlite::OptionalExtension;

use super::Store;
use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::Record;

/// Document-style store on top of SQLite: each record is a JSON blob in
/// `records`, and its index values are rows in `record_indexes`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn decode<R: Record>(values: Vec<String>) -> Result<Vec<R>> {
        values
            .iter()
            .map(|v| serde_json::from_str(v).map_err(AppError::from))
            .collect()
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put<R: Record>(&self, record: &R) -> Result<()> {
        let pool = self.pool.clone();
        let collection = R::COLLECTION;
        let key = record.key();
        let value = serde_json::to_string(record)?;
        let indexes = record.index_values();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO records (collection, key, value, updated_at)
                 VALUES (?, ?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT(collection, key)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![collection, key, value],
            )?;
            tx.execute(
                "DELETE FROM record_indexes WHERE collection = ? AND key = ?",
                rusqlite::params![collection, key],
            )?;
            for (index_name, index_value) in &indexes {
                tx.execute(
                    "INSERT OR IGNORE INTO record_indexes (collection, key, index_name, value)
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![collection, key, index_name, index_value],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    async fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let pool = self.pool.clone();
        let key = key.to_string();

        let value = tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let conn = pool.get()?;
            let value = conn
                .query_row(
                    "SELECT value FROM records WHERE collection = ? AND key = ?",
                    rusqlite::params![R::COLLECTION, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        value
            .map(|v| serde_json::from_str(&v).map_err(AppError::from))
            .transpose()
    }

    async fn delete<R: Record>(&self, key: &str) -> Result<()> {
        let pool = self.pool.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM record_indexes WHERE collection = ? AND key = ?",
                rusqlite::params![R::COLLECTION, key],
            )?;
            tx.execute(
                "DELETE FROM records WHERE collection = ? AND key = ?",
                rusqlite::params![R::COLLECTION, key],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    async fn all<R: Record>(&self) -> Result<Vec<R>> {
        let pool = self.pool.clone();

        let values = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT value FROM records WHERE collection = ?")?;
            let values = stmt
                .query_map([R::COLLECTION], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(values)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Self::decode(values)
    }

    async fn by_index<R: Record>(&self, index: &str, value: &str) -> Result<Vec<R>> {
        let pool = self.pool.clone();
        let index = index.to_string();
        let value = value.to_string();

        let values = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT DISTINCT r.key, r.value FROM records r
                 JOIN record_indexes i ON i.collection = r.collection AND i.key = r.key
                 WHERE r.collection = ? AND i.index_name = ? AND i.value = ?",
            )?;
            let values = stmt
                .query_map(rusqlite::params![R::COLLECTION, index, value], |row| {
                    row.get(1)
                })?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(values)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Self::decode(values)
    }
}

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, Transaction, TypeInfo, ValueRef};

use crate::database::manager::DatabaseError;
use crate::database::store::{Backend, ExecResult, Record, RelationalStore, SqlValue, StoreTransaction};

/// SQLite-backed store. Foreign keys are enforced on every connection.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32, timeout: Duration) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let filename = options.get_filename().to_path_buf();
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::QueryError(format!("cannot create database directory: {}", e)))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }
}

fn bind_all<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_deref()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" | "BOOLEAN" => {
                    Value::from(row.try_get_unchecked::<i64, _>(index)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                    Value::from(row.try_get_unchecked::<f64, _>(index)?)
                }
                "BLOB" => Value::from(hex::encode(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
                _ => Value::from(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

#[async_trait]
impl RelationalStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn query_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError> {
        let row = bind_all(sql, params).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn query_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError> {
        let rows = bind_all(sql, params).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError> {
        let result = bind_all(sql, params).execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
        })
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn query_one(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError> {
        let row = bind_all(sql, params).fetch_optional(&mut *self.tx).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn query_many(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError> {
        let rows = bind_all(sql, params).fetch_all(&mut *self.tx).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError> {
        let result = bind_all(sql, params).execute(&mut *self.tx).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::with_transaction;
    use crate::params;

    async fn store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("store.db").display());
        let store = SqliteStore::connect(&url, 2, Duration::from_secs(5)).await.unwrap();
        store
            .execute("CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, qty INTEGER)", &[])
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn binds_and_decodes_columns() {
        let (_dir, store) = store().await;
        let none: Option<i64> = None;
        let inserted = store
            .query_one("INSERT INTO items (name, qty) VALUES (?, ?) RETURNING id", &params!["a'; DROP TABLE items; --", none])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inserted["id"], 1);

        let row = store
            .query_one("SELECT id, name, qty FROM items WHERE id = ?", &params![1i64])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["name"], "a'; DROP TABLE items; --");
        assert!(row["qty"].is_null());
    }

    #[tokio::test]
    async fn failed_transaction_rolls_back() {
        let (_dir, store) = store().await;
        let result: Result<(), DatabaseError> = with_transaction::<_, DatabaseError, _>(&store, |tx| {
            Box::pin(async move {
                tx.execute("INSERT INTO items (name) VALUES (?)", &params!["kept?"]).await?;
                tx.execute("INSERT INTO missing_table (x) VALUES (1)", &[]).await?;
                Ok(())
            })
        })
        .await;
        assert!(result.is_err());

        let rows = store.query_many("SELECT * FROM items", &[]).await.unwrap();
        assert!(rows.is_empty());
    }
}

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, Transaction, TypeInfo, ValueRef};

use crate::database::manager::DatabaseError;
use crate::database::store::{Backend, ExecResult, Record, RelationalStore, SqlValue, StoreTransaction};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str, max_connections: u32, timeout: Duration) -> Result<Self, DatabaseError> {
        let options = PgConnectOptions::from_str(url)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }
}

/// Rewrite `?` placeholders to `$1..$n`, leaving quoted literals alone.
pub fn positional_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut in_single = false;
    let mut in_double = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(ch);
            }
            '?' if !in_single && !in_double => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}

fn bind_all<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, Postgres, PgArguments> {
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

fn decode_row(row: &PgRow) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INT2" => Value::from(row.try_get_unchecked::<i16, _>(index)?),
                "INT4" => Value::from(row.try_get_unchecked::<i32, _>(index)?),
                "INT8" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
                "FLOAT4" => Value::from(row.try_get_unchecked::<f32, _>(index)?),
                "FLOAT8" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
                "BOOL" => Value::from(row.try_get_unchecked::<bool, _>(index)?),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::from(row.try_get_unchecked::<String, _>(index)?),
                other => {
                    return Err(DatabaseError::Decode(format!(
                        "unsupported column type {} for {}",
                        other,
                        column.name()
                    )))
                }
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

#[async_trait]
impl RelationalStore for PostgresStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn query_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError> {
        let sql = positional_placeholders(sql);
        let row = bind_all(&sql, params).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn query_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError> {
        let sql = positional_placeholders(sql);
        let rows = bind_all(&sql, params).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError> {
        let sql = positional_placeholders(sql);
        let result = bind_all(&sql, params).execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
        })
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn query_one(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError> {
        let sql = positional_placeholders(sql);
        let row = bind_all(&sql, params).fetch_optional(&mut *self.tx).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn query_many(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError> {
        let sql = positional_placeholders(sql);
        let rows = bind_all(&sql, params).fetch_all(&mut *self.tx).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError> {
        let sql = positional_placeholders(sql);
        let result = bind_all(&sql, params).execute(&mut *self.tx).await?;
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

    #[test]
    fn rewrites_placeholders_in_order() {
        assert_eq!(
            positional_placeholders("SELECT * FROM t WHERE a = ? AND b = ?"),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
    }

    #[test]
    fn leaves_quoted_question_marks() {
        assert_eq!(
            positional_placeholders("SELECT '?' AS q, \"odd?\" FROM t WHERE id = ?"),
            "SELECT '?' AS q, \"odd?\" FROM t WHERE id = $1"
        );
    }
}

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;

/// A single result row, keyed by column name (or alias).
pub type Record = Map<String, Value>;

/// Bound statement parameter. Nulls carry their column type so backends
/// with strict parameter typing (PostgreSQL) accept them.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(Option<i64>),
    Real(Option<f64>),
    Text(Option<String>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(Some(v as i64))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(Some(v))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Option<&str>> for SqlValue {
    fn from(v: Option<&str>) -> Self {
        SqlValue::Text(v.map(str::to_string))
    }
}

/// Build a parameter list from heterogeneous values.
#[macro_export]
macro_rules! params {
    () => { Vec::<$crate::database::store::SqlValue>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::database::store::SqlValue::from($value)),+]
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

/// Parameterized access to the relational store.
///
/// Statements use `?` placeholders regardless of backend. Each call acquires
/// a pooled connection and returns it when the call completes.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    fn backend(&self) -> Backend;

    async fn query_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError>;

    async fn query_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError>;

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError>;

    /// Start a transaction holding one connection until commit or rollback.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.query_one("SELECT 1 AS ok", &[]).await.map(|_| ())
    }

    async fn close(&self) {}
}

/// Statements executed on a single connection inside an open transaction.
/// Dropping without `commit` rolls back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn query_one(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError>;

    async fn query_many(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError>;

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

/// Run `f` inside a transaction: commit on `Ok`, roll back and return the
/// original error on `Err`.
pub async fn with_transaction<T, E, F>(store: &dyn RelationalStore, f: F) -> Result<T, E>
where
    T: Send,
    E: From<DatabaseError> + Send,
    F: for<'t> FnOnce(&'t mut dyn StoreTransaction) -> BoxFuture<'t, Result<T, E>> + Send,
{
    let mut tx = store.begin().await?;
    match f(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Deserialize a typed model out of a record.
pub fn from_record<T: serde::de::DeserializeOwned>(record: Record) -> Result<T, DatabaseError> {
    serde_json::from_value(Value::Object(record)).map_err(|e| DatabaseError::Decode(e.to_string()))
}

pub fn from_records<T: serde::de::DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, DatabaseError> {
    records.into_iter().map(from_record).collect()
}

/// Read an integer column out of a record (e.g. `COUNT(*) AS count`).
pub fn record_i64(record: &Record, column: &str) -> Option<i64> {
    match record.get(column)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Extract the `id` produced by an `INSERT ... RETURNING id` statement.
pub fn returned_id(row: Option<Record>) -> Result<i64, DatabaseError> {
    row.as_ref()
        .and_then(|r| record_i64(r, "id"))
        .ok_or_else(|| DatabaseError::QueryError("insert did not return an id".to_string()))
}

/// Booleans are stored as INTEGER 0/1 on every backend.
pub fn int_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        Value::String(s) => Ok(matches!(s.as_str(), "1" | "true" | "TRUE" | "t")),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid boolean value: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Flag {
        #[serde(deserialize_with = "int_bool")]
        on: bool,
    }

    #[test]
    fn params_macro_keeps_null_types() {
        let none: Option<String> = None;
        let p = params![1i64, "x", none, Some(5i64)];
        assert_eq!(p[0], SqlValue::Integer(Some(1)));
        assert_eq!(p[1], SqlValue::Text(Some("x".into())));
        assert_eq!(p[2], SqlValue::Text(None));
        assert_eq!(p[3], SqlValue::Integer(Some(5)));
    }

    #[test]
    fn int_bool_accepts_integers() {
        let f: Flag = serde_json::from_value(json!({ "on": 1 })).unwrap();
        assert!(f.on);
        let f: Flag = serde_json::from_value(json!({ "on": 0 })).unwrap();
        assert!(!f.on);
    }

    #[test]
    fn record_i64_reads_numbers_and_strings() {
        let mut r = Record::new();
        r.insert("a".into(), json!(3));
        r.insert("b".into(), json!("7"));
        assert_eq!(record_i64(&r, "a"), Some(3));
        assert_eq!(record_i64(&r, "b"), Some(7));
        assert_eq!(record_i64(&r, "c"), None);
    }
}

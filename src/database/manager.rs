use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::postgres::PostgresStore;
use crate::database::sqlite::SqliteStore;
use crate::database::store::RelationalStore;

/// Errors from the relational store adapter
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedBackend(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Row decode error: {0}")]
    Decode(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                return DatabaseError::Constraint(db_err.message().to_string());
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Open the store selected by the URL scheme of `DATABASE_URL`.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn RelationalStore>, DatabaseError> {
    let timeout = Duration::from_secs(config.connection_timeout);
    let url = config.url.as_str();

    if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url, config.max_connections, timeout).await?;
        info!("Connected to SQLite store");
        Ok(Arc::new(store))
    } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
        let store = PostgresStore::connect(url, config.max_connections, timeout).await?;
        info!("Connected to PostgreSQL store");
        Ok(Arc::new(store))
    } else {
        let scheme = url.split(':').next().unwrap_or_default().to_string();
        Err(DatabaseError::UnsupportedBackend(scheme))
    }
}

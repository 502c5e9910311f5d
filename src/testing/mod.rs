use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::database::schema::migrate;
use crate::database::sqlite::SqliteStore;
use crate::database::{Backend, DatabaseError, ExecResult, Record, RelationalStore, SqlValue, StoreTransaction};
use crate::storage::{FileStore, UploadedFile};

/// A throwaway SQLite database and upload root. Both vanish on drop.
pub struct StoreFixture {
    pub dir: TempDir,
    pub store: Arc<dyn RelationalStore>,
    pub files: FileStore,
    pub config: AppConfig,
}

/// Fixture with the schema applied and default data seeded.
pub async fn temp_store() -> StoreFixture {
    let fixture = empty_store().await;
    migrate(fixture.store.as_ref(), &fixture.config.admin)
        .await
        .expect("failed to migrate test database");
    fixture
}

/// Fixture with an empty database and no tables.
pub async fn empty_store() -> StoreFixture {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut config = AppConfig::development();
    config.database.url = format!("sqlite://{}", dir.path().join("test.db").display());
    config.uploads.root = dir.path().join("uploads");
    config.security.jwt_secret = "test-secret".to_string();

    let store = SqliteStore::connect(&config.database.url, 4, Duration::from_secs(5))
        .await
        .expect("failed to open test database");
    let files = FileStore::new(config.uploads.clone());

    StoreFixture {
        dir,
        store: Arc::new(store),
        files,
        config,
    }
}

pub fn pdf(name: &str) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 test".to_vec(),
    }
}

pub fn png(name: &str) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

/// Store wrapper that injects failures: transactions fail on the Nth
/// `execute` (1-based), and plain statements starting with `fail_prefix` fail.
pub struct FailingStore {
    inner: Arc<dyn RelationalStore>,
    fail_on: usize,
    fail_prefix: Option<&'static str>,
    executed: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn RelationalStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            fail_prefix: None,
            executed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn on_statement(inner: Arc<dyn RelationalStore>, prefix: &'static str) -> Self {
        Self {
            inner,
            fail_on: 0,
            fail_prefix: Some(prefix),
            executed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn check(&self, sql: &str) -> Result<(), DatabaseError> {
        match self.fail_prefix {
            Some(prefix) if sql.trim_start().starts_with(prefix) => {
                Err(DatabaseError::QueryError("injected failure".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RelationalStore for FailingStore {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    async fn query_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError> {
        self.check(sql)?;
        self.inner.query_one(sql, params).await
    }

    async fn query_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError> {
        self.inner.query_many(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError> {
        self.check(sql)?;
        self.inner.execute(sql, params).await
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            fail_on: self.fail_on,
            executed: self.executed.clone(),
        }))
    }
}

struct FailingTransaction {
    inner: Box<dyn StoreTransaction>,
    fail_on: usize,
    executed: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreTransaction for FailingTransaction {
    async fn query_one(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Record>, DatabaseError> {
        self.inner.query_one(sql, params).await
    }

    async fn query_many(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>, DatabaseError> {
        self.inner.query_many(sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DatabaseError> {
        let count = self.executed.fetch_add(1, Ordering::SeqCst) + 1;
        if count == self.fail_on {
            return Err(DatabaseError::QueryError("injected failure".to_string()));
        }
        self.inner.execute(sql, params).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.rollback().await
    }
}

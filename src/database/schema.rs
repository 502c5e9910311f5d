use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::config::AdminSeedConfig;
use crate::database::clock::timestamp_now;
use crate::database::manager::DatabaseError;
use crate::database::models::category::DEFAULT_CATEGORIES;
use crate::database::models::{user, Role};
use crate::database::store::{record_i64, Backend, RelationalStore};
use crate::params;

/// Table bodies shared by both backends; `{id}` expands to the backend's
/// auto-increment primary key and `{int}` to its integer type.
const TABLES: [(&str, &str); 7] = [
    (
        "Users",
        "id {id},
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'editor' CHECK (role IN ('admin', 'editor')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL",
    ),
    (
        "Categories",
        "id {id},
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL",
    ),
    (
        "Publications",
        "id {id},
        title TEXT NOT NULL,
        content TEXT,
        summary TEXT,
        category_id {int} REFERENCES Categories(id) ON DELETE SET NULL,
        pdf_file_path TEXT,
        file_size {int},
        published_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL",
    ),
    (
        "Services",
        "id {id},
        title TEXT NOT NULL,
        description TEXT,
        icon TEXT,
        order_number {int} NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL",
    ),
    (
        "Seminars",
        "id {id},
        title TEXT NOT NULL,
        description TEXT,
        image_path TEXT,
        event_date TEXT,
        status TEXT DEFAULT 'Upcoming',
        seats_available {int},
        location TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL",
    ),
    (
        "Newspapers",
        "id {id},
        title TEXT NOT NULL,
        description TEXT,
        pdf_file_path TEXT NOT NULL,
        issue_date TEXT,
        cover_image_path TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL",
    ),
    (
        "WhistleblowerReports",
        "id {id},
        name TEXT,
        email TEXT,
        message TEXT NOT NULL,
        is_anonymous {int} NOT NULL DEFAULT 1,
        reference_number TEXT NOT NULL UNIQUE,
        admin_notes TEXT,
        status TEXT NOT NULL DEFAULT 'Pending',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL",
    ),
];

const INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_publications_category ON Publications (category_id)",
    "CREATE INDEX IF NOT EXISTS idx_services_order ON Services (order_number)",
    "CREATE INDEX IF NOT EXISTS idx_seminars_event_date ON Seminars (event_date)",
    "CREATE INDEX IF NOT EXISTS idx_newspapers_issue_date ON Newspapers (issue_date)",
];

fn create_table_sql(backend: Backend, table: &str, body: &str) -> String {
    let (id, int) = match backend {
        Backend::Sqlite => ("INTEGER PRIMARY KEY AUTOINCREMENT", "INTEGER"),
        Backend::Postgres => ("BIGSERIAL PRIMARY KEY", "BIGINT"),
    };
    let body = body.replace("{id}", id).replace("{int}", int);
    format!("CREATE TABLE IF NOT EXISTS {} (\n        {}\n    )", table, body)
}

/// Create every table and index if missing, then seed reference data.
/// Safe to run on every startup.
pub async fn migrate(store: &dyn RelationalStore, admin: &AdminSeedConfig) -> Result<(), DatabaseError> {
    let backend = store.backend();
    for (table, body) in TABLES {
        store.execute(&create_table_sql(backend, table, body), &[]).await?;
    }
    for index in INDEXES {
        store.execute(index, &[]).await?;
    }
    info!("Schema ready ({} tables)", TABLES.len());

    seed_categories(store).await?;
    seed_admin(store, admin).await?;
    Ok(())
}

async fn seed_categories(store: &dyn RelationalStore) -> Result<(), DatabaseError> {
    let row = store.query_one("SELECT COUNT(*) AS count FROM Categories", &[]).await?;
    if row.as_ref().and_then(|r| record_i64(r, "count")).unwrap_or(0) > 0 {
        return Ok(());
    }

    let now = timestamp_now();
    for name in DEFAULT_CATEGORIES {
        store
            .execute(
                "INSERT INTO Categories (name, created_at) VALUES (?, ?)",
                &params![name, now.as_str()],
            )
            .await?;
    }
    info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());
    Ok(())
}

async fn seed_admin(store: &dyn RelationalStore, admin: &AdminSeedConfig) -> Result<(), DatabaseError> {
    if user::count(store).await? > 0 {
        return Ok(());
    }

    let Some(password) = admin.default_password.clone() else {
        warn!("No users exist and ADMIN_DEFAULT_PASSWORD is not set; skipping admin seed");
        return Ok(());
    };

    let hash = hash_password(password)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("failed to hash admin password: {}", e)))?;
    user::insert(store, &admin.username, &admin.email, &hash, Role::Admin).await?;
    info!("Seeded default admin user {}", admin.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_store;

    #[test]
    fn postgres_ddl_uses_bigserial() {
        let sql = create_table_sql(Backend::Postgres, TABLES[0].0, TABLES[0].1);
        assert!(sql.contains("BIGSERIAL PRIMARY KEY"));
        assert!(!sql.contains("{id}"));
    }

    #[tokio::test]
    async fn migrate_is_idempotent_and_seeds_once() {
        let fixture = temp_store().await;
        let config = crate::config::AppConfig::development().admin;
        migrate(fixture.store.as_ref(), &config).await.unwrap();
        migrate(fixture.store.as_ref(), &config).await.unwrap();

        let categories = fixture.store.query_many("SELECT name FROM Categories", &[]).await.unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(user::count(fixture.store.as_ref()).await.unwrap(), 1);

        let admin = user::find_by_email(fixture.store.as_ref(), "admin@integriting.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_ne!(admin.password_hash, "admin123");
    }

    #[tokio::test]
    async fn skips_admin_without_password() {
        let fixture = crate::testing::empty_store().await;
        let mut config = crate::config::AppConfig::development().admin;
        config.default_password = None;
        migrate(fixture.store.as_ref(), &config).await.unwrap();
        assert_eq!(user::count(fixture.store.as_ref()).await.unwrap(), 0);
    }
}

use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;
use crate::database::{self, schema};

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    let store = database::connect(&config.database)
        .await
        .context("failed to open the database")?;
    schema::migrate(store.as_ref(), &config.admin)
        .await
        .context("migration failed")?;
    info!("Migration complete");
    Ok(())
}

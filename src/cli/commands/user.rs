use anyhow::Context;

use crate::auth::AuthService;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::Role;
use crate::database::{self, schema};

pub async fn create(
    config: AppConfig,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let store = database::connect(&config.database)
        .await
        .context("failed to open the database")?;
    schema::migrate(store.as_ref(), &config.admin)
        .await
        .context("failed to prepare the schema")?;

    let auth = AuthService::new(store, &config.security.jwt_secret, config.security.jwt_expiry_hours);
    let user = auth
        .create_user(username, email, password, role)
        .await
        .context("failed to create user")?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Text => println!("Created {} {} <{}> (id {})", user.role, user.username, user.email, user.id),
    }
    Ok(())
}

#![allow(dead_code)]

use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tempfile::TempDir;

use integriting_api::config::AppConfig;
use integriting_api::database::{self, schema};
use integriting_api::{app, AppState};

pub const ADMIN_EMAIL: &str = "admin@integriting.com";
pub const ADMIN_PASSWORD: &str = "admin123";

/// A live router on an ephemeral port over a throwaway database and upload root.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let mut config = AppConfig::development();
        config.database.url = format!("sqlite://{}", dir.path().join("api.db").display());
        config.uploads.root = dir.path().join("uploads");
        config.security.jwt_secret = "integration-secret".to_string();
        config.admin.email = ADMIN_EMAIL.to_string();
        config.admin.default_password = Some(ADMIN_PASSWORD.to_string());

        let store = database::connect(&config.database).await?;
        schema::migrate(store.as_ref(), &config.admin).await?;

        let router = app(AppState::new(store, config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            dir,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?)
    }

    /// Bearer token for the seeded admin.
    pub async fn admin_token(&self) -> Result<String> {
        let body: Value = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response had no token")
    }
}

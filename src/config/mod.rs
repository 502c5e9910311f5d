use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Secret used when JWT_SECRET is not set. Refused in production.
pub const DEVELOPMENT_JWT_SECRET: &str = "CHANGE_THIS_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub uploads: UploadConfig,
    pub admin: AdminSeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub pdf_max_bytes: usize,
    pub image_max_bytes: usize,
    pub newspaper_max_bytes: usize,
    pub any_max_bytes: usize,
    pub max_batch_files: usize,
}

impl UploadConfig {
    /// Largest single request body the router has to accept.
    pub fn max_request_bytes(&self) -> usize {
        let largest = self
            .pdf_max_bytes
            .max(self.image_max_bytes)
            .max(self.newspaper_max_bytes)
            .max(self.any_max_bytes);
        // Batch uploads and newspaper pdf+cover pairs carry several files
        largest.saturating_mul(self.max_batch_files.max(2)) + 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSeedConfig {
    pub email: String,
    pub username: String,
    pub default_password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-default value in production")]
    InsecureJwtSecret,
    #[error("JWT_SECRET must not be empty")]
    EmptyJwtSecret,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Upload overrides
        if let Ok(v) = env::var("UPLOADS_DIR") {
            self.uploads.root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("UPLOAD_PDF_MAX_BYTES") {
            self.uploads.pdf_max_bytes = v.parse().unwrap_or(self.uploads.pdf_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_IMAGE_MAX_BYTES") {
            self.uploads.image_max_bytes = v.parse().unwrap_or(self.uploads.image_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_NEWSPAPER_MAX_BYTES") {
            self.uploads.newspaper_max_bytes = v.parse().unwrap_or(self.uploads.newspaper_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_ANY_MAX_BYTES") {
            self.uploads.any_max_bytes = v.parse().unwrap_or(self.uploads.any_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_MAX_BATCH_FILES") {
            self.uploads.max_batch_files = v.parse().unwrap_or(self.uploads.max_batch_files);
        }

        // Admin seed overrides
        if let Ok(v) = env::var("ADMIN_EMAIL") {
            self.admin.email = v;
        }
        if let Ok(v) = env::var("ADMIN_USERNAME") {
            self.admin.username = v;
        }
        if let Ok(v) = env::var("ADMIN_DEFAULT_PASSWORD") {
            self.admin.default_password = Some(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite://data/integriting.db".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 8,
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
            },
            uploads: UploadConfig::defaults(PathBuf::from("uploads")),
            admin: AdminSeedConfig {
                email: "admin@integriting.com".to_string(),
                username: "admin".to_string(),
                default_password: Some("admin123".to_string()),
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 10;
        config.database.connection_timeout = 10;
        config.security.cors_origins = vec!["https://staging.integriting.com".to_string()];
        config
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite://data/integriting.db".to_string(),
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                enable_cors: true,
                cors_origins: vec!["https://integriting.com".to_string()],
            },
            uploads: UploadConfig::defaults(PathBuf::from("uploads")),
            admin: AdminSeedConfig {
                email: "admin@integriting.com".to_string(),
                username: "admin".to_string(),
                default_password: None,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }
        if self.is_production() && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

impl UploadConfig {
    fn defaults(root: PathBuf) -> Self {
        Self {
            root,
            pdf_max_bytes: 20 * 1024 * 1024,       // 20MB
            image_max_bytes: 5 * 1024 * 1024,      // 5MB
            newspaper_max_bytes: 30 * 1024 * 1024, // 30MB
            any_max_bytes: 30 * 1024 * 1024,       // 30MB
            max_batch_files: 10,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.security.jwt_expiry_hours, 8);
        assert_eq!(config.uploads.pdf_max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.uploads.image_max_bytes, 5 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let mut config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyJwtSecret)));

        config.security.jwt_secret = DEVELOPMENT_JWT_SECRET.to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InsecureJwtSecret)));

        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
        assert!(config.admin.default_password.is_none());
    }

    #[test]
    fn request_limit_covers_batch_uploads() {
        let uploads = AppConfig::development().uploads;
        assert!(uploads.max_request_bytes() > uploads.any_max_bytes * 2);
    }
}

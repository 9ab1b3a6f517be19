use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the server falls back to in-memory stores (development only)
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Base URL used to build public links to stored files
    pub public_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,

    #[error("DATABASE_URL must be set in {0:?} mode")]
    MissingDatabaseUrl(Environment),
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = env::var("PORTFOLIO_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ARGON2_MEMORY_KIB") {
            self.security.argon2_memory_kib = v.parse().unwrap_or(self.security.argon2_memory_kib);
        }
        if let Ok(v) = env::var("SECURITY_ARGON2_ITERATIONS") {
            self.security.argon2_iterations = v.parse().unwrap_or(self.security.argon2_iterations);
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("APP_URL") {
            self.storage.public_url = v.trim_end_matches('/').to_string();
        }

        self
    }

    /// Checks settings that have no safe default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if self.database.url.is_none() && self.environment != Environment::Development {
            return Err(ConfigError::MissingDatabaseUrl(self.environment));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                argon2_memory_kib: 19 * 1024,
                argon2_iterations: 2,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("storage"),
                public_url: "http://localhost:3000".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                argon2_memory_kib: 19 * 1024,
                argon2_iterations: 2,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("storage"),
                public_url: "https://staging.example.com".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
                max_request_size_bytes: 4 * 1024 * 1024, // 4MB, leaves room for a 2MB image
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                argon2_memory_kib: 19 * 1024,
                argon2_iterations: 2,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("/var/lib/portfolio/storage"),
                public_url: "https://example.com".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

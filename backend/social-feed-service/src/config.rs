/// Configuration management for Social Feed Service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Session token verification
    pub auth: AuthConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Feed paging
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Comma-separated list of allowed origins
    pub cors_allowed_origins: String,
    /// Emit JSON log lines
    pub json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{}'", other),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Database URL, required for the postgres backend
    pub url: Option<String>,
    /// Max connections in pool
    pub max_connections: u32,
    /// Min connections in pool
    pub min_connections: u32,
}

/// Session token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the auth provider
    pub jwt_secret: String,
    /// Expected `aud` claim
    pub jwt_audience: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("unknown STORAGE_BACKEND '{}'", other),
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Base URL public object URLs are built from
    pub public_base_url: String,
}

/// Feed paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub page_size: i64,
    pub max_page_size: i64,
}

impl FeedConfig {
    /// Clamp a requested page size into `1..=max_page_size`.
    pub fn clamp_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 100,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: env_or("APP_ENV", "development"),
            host: env_or("APP_HOST", "0.0.0.0"),
            port: parse_env_or("PORT", 8080)?,
            cors_allowed_origins: env_or("CORS_ALLOWED_ORIGINS", "*"),
            json_logs: env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        };

        let backend: StoreBackend = env_or("STORE_BACKEND", "postgres").parse()?;
        let url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && url.is_none() {
            bail!("DATABASE_URL environment variable not set");
        }
        let database = DatabaseConfig {
            backend,
            url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 2)?,
        };

        let auth = AuthConfig {
            jwt_secret: std::env::var("AUTH_JWT_SECRET")
                .context("AUTH_JWT_SECRET environment variable not set")?,
            jwt_audience: env_or("AUTH_JWT_AUDIENCE", "authenticated"),
        };

        let storage = StorageConfig {
            backend: env_or("STORAGE_BACKEND", "s3").parse()?,
            public_base_url: env_or("STORAGE_PUBLIC_BASE_URL", "http://localhost:9000")
                .trim_end_matches('/')
                .to_string(),
        };

        let feed = FeedConfig {
            page_size: parse_env_or("FEED_PAGE_SIZE", 20)?,
            max_page_size: parse_env_or("FEED_MAX_PAGE_SIZE", 100)?,
        };

        Ok(Config {
            app,
            database,
            auth,
            storage,
            feed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "PORT",
        "STORE_BACKEND",
        "DATABASE_URL",
        "AUTH_JWT_SECRET",
        "STORAGE_BACKEND",
        "FEED_PAGE_SIZE",
        "FEED_MAX_PAGE_SIZE",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        clear_env();
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("AUTH_JWT_SECRET", "secret");

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.port, 8080);
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.auth.jwt_audience, "authenticated");
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.feed.page_size, 20);
        clear_env();
    }

    #[test]
    #[serial]
    fn postgres_backend_requires_database_url() {
        clear_env();
        std::env::set_var("AUTH_JWT_SECRET", "secret");

        assert!(Config::from_env().is_err());

        std::env::set_var("STORE_BACKEND", "memory");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert!(config.database.url.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_numbers_are_rejected() {
        clear_env();
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("AUTH_JWT_SECRET", "secret");
        std::env::set_var("PORT", "not-a-port");

        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn limit_is_clamped() {
        let feed = FeedConfig::default();
        assert_eq!(feed.clamp_limit(None), 20);
        assert_eq!(feed.clamp_limit(Some(0)), 1);
        assert_eq!(feed.clamp_limit(Some(1000)), 100);
        assert_eq!(feed.clamp_limit(Some(7)), 7);
    }
}

//! Configuration management for Vote Service
//!
//! Loads configuration from environment variables (and `.env` if present).
use anyhow::{bail, Context, Result};
use std::str::FromStr;

/// Secret used only when APP_ENV=development and JWT_SECRET is unset
const DEV_JWT_SECRET: &str = "vote-service-dev-secret";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Emit JSON logs instead of plain text
    pub json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Required for the postgres backend
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Identity token settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
}

impl AuthConfig {
    /// True when running on the built-in development secret
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let app = AppConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_or("PORT", 8080)?,
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            env,
        };

        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) => parse_backend(&raw)?,
            Err(_) => StorageBackend::Memory,
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL environment variable not set (STORAGE_BACKEND=postgres)");
        }

        let storage = StorageConfig {
            backend,
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", default_max_connections())?,
            min_connections: env_or("DB_MIN_CONNECTIONS", default_min_connections())?,
        };
        if storage.min_connections > storage.max_connections {
            bail!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                storage.min_connections,
                storage.max_connections
            );
        }

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if app.env == "development" => DEV_JWT_SECRET.to_string(),
            _ => bail!("JWT_SECRET environment variable not set"),
        };

        Ok(Config {
            app,
            storage,
            auth: AuthConfig { jwt_secret },
        })
    }
}

/// Read `key` from the environment, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_var(key, std::env::var(key).ok(), default)
}

fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn parse_backend(raw: &str) -> Result<StorageBackend> {
    match raw.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
        other => bail!("Invalid STORAGE_BACKEND: {} (expected memory or postgres)", other),
    }
}

//! Environment-driven configuration
//!
//! Values come from the process environment. The server binary loads a
//! `.env` file first, so local development can keep them there.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_POOL_SIZE,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
        }
    }

    /// Read `DATABASE_URL`, or assemble one from the `IDENTIFIERSDB_*`
    /// variables, plus `DATABASE_POOL_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => {
                let part = |key: &str| {
                    lookup(key).ok_or_else(|| ConfigError::Missing(format!("DATABASE_URL or {key}")))
                };
                format!(
                    "postgres://{}:{}@{}/{}",
                    part("IDENTIFIERSDB_USER")?,
                    part("IDENTIFIERSDB_PASS")?,
                    part("IDENTIFIERSDB_HOST")?,
                    part("IDENTIFIERSDB_DB")?,
                )
            }
        };

        let mut config = Self::new(database_url);
        if let Some(size) = lookup("DATABASE_POOL_SIZE") {
            config.max_connections = size.parse().map_err(|_| ConfigError::Invalid {
                key: "DATABASE_POOL_SIZE".to_string(),
                value: size.clone(),
            })?;
        }
        Ok(config)
    }

    pub fn masked_url(&self) -> String {
        mask_database_url(&self.database_url)
    }
}

/// Settings for the translator service as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
    pub debug: bool,
}

impl TranslatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(&lookup)?;

        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR".to_string(),
            value: bind.clone(),
        })?;

        Ok(Self {
            database,
            bind_addr,
            debug: lookup("API_DEBUG").as_deref().is_some_and(is_truthy),
        })
    }
}

/// `true`, `True` and `1` switch a flag on
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "true" | "True" | "1")
}

/// Mask sensitive information in database URL for logging
pub fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let mut masked = parsed.clone();
            if parsed.password().is_some() {
                let _ = masked.set_password(Some("***"));
            }
            masked.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

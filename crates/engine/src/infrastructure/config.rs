//! Application configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

use super::cache::DEFAULT_MAX_ENTRIES;
use super::resilient_http::RetryConfig;
use super::turso::TursoSettings;

/// How much the service logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Lifecycle and errors
    #[default]
    Simple,
    /// Engine activity only, dependencies kept at warn
    Work,
    /// Everything, including request and response bodies
    Complete,
}

impl LogLevel {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Simple => "info",
            LogLevel::Work => "warn,krazyplanet_engine=info",
            LogLevel::Complete => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(LogLevel::Simple),
            "work" => Ok(LogLevel::Work),
            "complete" => Ok(LogLevel::Complete),
            other => Err(ConfigError::Invalid {
                key: "LOG_LEVEL",
                reason: format!("'{}' is not one of simple, work, complete", other),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Turso store configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: SecretString,
    /// Concurrent HTTP calls allowed against the store
    pub max_connections: usize,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub timeout_seconds: u64,
    /// Seconds between background health reports
    pub interval_seconds: u64,
    pub database_enabled: bool,
    pub memory_enabled: bool,
    pub memory_threshold_mb: u64,
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// NATS server URL
    pub nats_url: String,
    /// Name reported in health check replies
    pub service_name: String,
    pub log_level: LogLevel,
    pub database: DatabaseConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub health: HealthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let retry_defaults = RetryConfig::default();

        Ok(Self {
            nats_url: var("NATS_URL", "nats://localhost:4222"),
            service_name: var("SERVICE_NAME", "TursoConnector"),
            log_level: var("LOG_LEVEL", "simple")
                .parse()
                .context("LOG_LEVEL must be simple, work or complete")?,

            database: DatabaseConfig {
                url: lookup("TURSO_DATABASE_URL")
                    .context("TURSO_DATABASE_URL environment variable is required")?,
                auth_token: SecretString::from(
                    lookup("TURSO_AUTH_TOKEN")
                        .context("TURSO_AUTH_TOKEN environment variable is required")?,
                ),
                max_connections: var("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be a positive integer")?,
                request_timeout_seconds: var("DB_REQUEST_TIMEOUT_SECONDS", "30")
                    .parse()
                    .context("DB_REQUEST_TIMEOUT_SECONDS must be a positive integer")?,
            },

            retry: RetryConfig {
                max_attempts: var("RETRY_MAX_ATTEMPTS", "3")
                    .parse()
                    .context("RETRY_MAX_ATTEMPTS must be an integer")?,
                base_delay_ms: var("RETRY_BASE_DELAY_MS", "1000")
                    .parse()
                    .context("RETRY_BASE_DELAY_MS must be an integer")?,
                max_delay_ms: retry_defaults.max_delay_ms,
            },

            cache: CacheConfig {
                enabled: parse_bool(&var("CACHE_ENABLED", "true")),
                max_size: var("CACHE_MAX_SIZE", &DEFAULT_MAX_ENTRIES.to_string())
                    .parse()
                    .context("CACHE_MAX_SIZE must be an integer")?,
            },

            health: HealthConfig {
                timeout_seconds: var("HEALTH_TIMEOUT_SECONDS", "10")
                    .parse()
                    .unwrap_or(10),
                interval_seconds: var("HEALTH_INTERVAL_SECONDS", "30")
                    .parse()
                    .unwrap_or(30),
                database_enabled: parse_bool(&var("HEALTH_DATABASE_ENABLED", "true")),
                memory_enabled: parse_bool(&var("HEALTH_MEMORY_ENABLED", "true")),
                memory_threshold_mb: var("HEALTH_MEMORY_THRESHOLD_MB", "500")
                    .parse()
                    .unwrap_or(500),
            },
        })
    }

    /// Check value ranges that parsing alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::invalid("TURSO_DATABASE_URL", "must not be empty"));
        }
        if self.database.auth_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::invalid("TURSO_AUTH_TOKEN", "must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("DB_MAX_CONNECTIONS", "must be at least 1"));
        }
        if self.database.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "DB_REQUEST_TIMEOUT_SECONDS",
                "must be at least 1",
            ));
        }
        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(ConfigError::invalid(
                "RETRY_MAX_ATTEMPTS",
                format!("{} is outside 1..=10", self.retry.max_attempts),
            ));
        }
        if !(10..=10_000).contains(&self.cache.max_size) {
            return Err(ConfigError::invalid(
                "CACHE_MAX_SIZE",
                format!("{} is outside 10..=10000", self.cache.max_size),
            ));
        }
        if self.health.interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "HEALTH_INTERVAL_SECONDS",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn turso_settings(&self) -> TursoSettings {
        TursoSettings {
            database_url: self.database.url.clone(),
            auth_token: self.database.auth_token.clone(),
            request_timeout: Duration::from_secs(self.database.request_timeout_seconds),
            cache_enabled: self.cache.enabled,
            cache_max_entries: self.cache.max_size,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

use std::str::FromStr;
use std::time::Duration;

use timetravel_db::{PoolConfig, StoreConfig};

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// SQLite database URL (default: `sqlite://timetravel.db`).
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deadline for a single record operation in milliseconds (default: `5000`).
    pub store_op_timeout_ms: u64,
    /// How long to wait for in-flight requests on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Connection pool settings.
    pub pool: PoolConfig,
    /// Store retry policy.
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `DATABASE_URL`          | `sqlite://timetravel.db`   |
    /// | `DB_MAX_CONNECTIONS`    | `10`                       |
    /// | `DB_BUSY_TIMEOUT_MS`    | `5000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `STORE_OP_TIMEOUT_MS`   | `5000`                     |
    /// | `MAX_UPDATE_ATTEMPTS`   | `10`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000u16, "u16")?;
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://timetravel.db".into());

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64, "u64")?;
        let store_op_timeout_ms = parse_or(&lookup, "STORE_OP_TIMEOUT_MS", 5000u64, "u64")?;
        let shutdown_timeout_secs = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30u64, "u64")?;

        let pool = PoolConfig {
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32, "u32")?,
            busy_timeout: Duration::from_millis(parse_or(
                &lookup,
                "DB_BUSY_TIMEOUT_MS",
                5000u64,
                "u64",
            )?),
        };

        let store = StoreConfig {
            max_update_attempts: parse_or(&lookup, "MAX_UPDATE_ATTEMPTS", 10u32, "u32")?,
            ..StoreConfig::default()
        };

        Ok(Self {
            host,
            port,
            database_url,
            cors_origins,
            request_timeout_secs,
            store_op_timeout_ms,
            shutdown_timeout_secs,
            pool,
            store,
        })
    }

    pub fn store_op_timeout(&self) -> Duration {
        Duration::from_millis(self.store_op_timeout_ms)
    }
}

fn parse_or<F, T>(
    lookup: &F,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
    }
}

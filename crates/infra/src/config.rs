//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset values fall back to dev
//! defaults. `DATABASE_URL` unset selects the in-memory stores.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` runs against in-memory stores.
    pub database: Option<DatabaseConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections,
            });

        Ok(Self {
            bind_addr,
            database,
        })
    }
}

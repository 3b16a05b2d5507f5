//! Infrastructure layer: config, in-memory and Postgres repositories.

pub mod config;
pub mod in_memory;
pub mod postgres;
pub mod sql;


pub use config::{Config, ConfigError, DatabaseConfig};
pub use in_memory::{InMemoryCatalog, InMemoryRegionStore};
pub use postgres::{PostgresCatalog, PostgresRegionStore, connect, migrate};

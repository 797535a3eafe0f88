//! MySQL backend for relata: connection configuration and a blocking
//! [`relata_db::Executor`] over sqlx.

pub mod config;
pub mod executor;

pub use config::{ConfigError, ConfigResult, ConnectionConfig};
pub use executor::{open, MySqlConnector, MySqlDatabase, MySqlExecutor};

//! Database facade for relata.
//!
//! [`Database`] owns one executor connection and a registry of table
//! snapshots. Every operation goes through the translator's
//! validate → translate → interpret pipeline; schema changes read the
//! affected table back from the engine.

pub mod database;
pub mod executor;
pub mod schema;

pub use database::Database;
pub use executor::{Connector, ExecOptions, Executor};

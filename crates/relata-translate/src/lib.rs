//! Validate, translate and interpret database operations.
//!
//! A [`Translator`] is keyed to one [`Dialect`]. It checks a [`Request`]
//! against a [`Catalog`] of tables, renders it as query text and shapes
//! the executor's raw rows into a [`QueryOutput`].

pub mod catalog;
pub mod dialect;
mod interpret;
pub mod method;
pub mod mysql;
pub mod request;
mod render;
pub mod translator;
mod validate;

pub use catalog::{Catalog, MemoryCatalog};
pub use dialect::{is_bare_identifier, ConstraintClause, Dialect};
pub use method::{ConstraintKind, Method};
pub use mysql::{value_from_text, MySql};
pub use request::{Fields, Modifiers, QueryOutput, Request, TableRef};
pub use translator::{JoinDirection, Translator};

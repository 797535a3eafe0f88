//! Schema model for relata.
//!
//! Columns, tables and constraints, the column definition grammar, query
//! expressions and the error taxonomy shared by the other crates.

pub mod column;
pub mod constraints;
mod definition;
pub mod error;
pub mod expr;
pub mod redaction;
pub mod table;
pub mod value;

pub use column::{Column, ColumnRef};
pub use constraints::{
    ColumnKey, Constraint, ForeignKey, Index, KeyKind, Lookup, PrimaryKey, RowSource, Unique,
};
pub use error::{check_name_len, Error, Result, MAX_NAME_LEN};
pub use expr::{ArithmeticOp, ComparisonOp, Expr, ExprKind};
pub use redaction::redact_url;
pub use table::Table;
pub use value::{Row, Value};

/// Anything addressable by name: columns, tables and constraints.
pub trait Named {
    fn name(&self) -> &str;
}

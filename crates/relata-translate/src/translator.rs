use std::fmt;

use relata_core::expr;
use relata_core::{ArithmeticOp, Column, Error, Expr, Named, Result, Row, Table, Value};

use crate::catalog::Catalog;
use crate::dialect::Dialect;
use crate::interpret;
use crate::method::Method;
use crate::render;
use crate::request::{QueryOutput, Request};
use crate::validate;

/// Join direction for [`Translator::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinDirection {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinDirection::Inner => "inner",
            JoinDirection::Left => "left",
            JoinDirection::Right => "right",
            JoinDirection::Cross => "cross",
        })
    }
}

/// Validate, translate and interpret requests for one dialect.
#[derive(Debug, Clone, Default)]
pub struct Translator<D> {
    dialect: D,
}

impl<D: Dialect> Translator<D> {
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Check a request against the catalog, failing on the first problem.
    ///
    /// Order: connection, method, table reference, then every structural
    /// check before any semantic one.
    pub fn validate_and_raise(&self, catalog: &dyn Catalog, request: &Request) -> Result<()> {
        let resolved = validate::validate(&self.dialect, catalog, request)?;
        tracing::debug!(
            event = "query_validated",
            method = resolved.method.keyword(),
            table = %request.table.name()
        );
        Ok(())
    }

    /// Boolean form of [`Translator::validate_and_raise`].
    pub fn validate(&self, catalog: &dyn Catalog, request: &Request) -> bool {
        self.validate_and_raise(catalog, request).is_ok()
    }

    /// Render a validated request as query text terminated by `;`.
    pub fn translate(&self, catalog: &dyn Catalog, request: &Request) -> Result<String> {
        let resolved = validate::resolve(catalog, request).map_err(|err| {
            Error::Internal(format!("translate called on an unvalidated request: {err}"))
        })?;
        render::translate(&self.dialect, &resolved, request)
    }

    /// `describe` text for a table that need not be in any catalog yet.
    ///
    /// Used to read back a table right after the DDL that created or changed it.
    pub fn describe_text(&self, table: &str) -> Result<String> {
        let request = Request::new("describe", table);
        let resolved = validate::Resolved {
            method: Method::Describe,
            table: None,
        };
        render::translate(&self.dialect, &resolved, &request)
    }

    /// `show tables` text; needs no catalog.
    pub fn show_tables_text(&self) -> Result<String> {
        let request = Request::new("show tables", "");
        let resolved = validate::Resolved {
            method: Method::ShowTables,
            table: None,
        };
        render::translate(&self.dialect, &resolved, &request)
    }

    /// Turn a raw executor response into a typed result.
    pub fn interpret(&self, request: &Request, raw: Option<Vec<Row>>) -> Result<QueryOutput> {
        interpret::interpret(&self.dialect, request, raw)
    }

    /// Render an expression with this dialect's literals.
    pub fn render(&self, expr: &Expr) -> String {
        render::render_expr(&self.dialect, expr)
    }

    pub fn literal(&self, value: &Value) -> String {
        self.dialect.literal(value)
    }

    pub fn add(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::operation(ArithmeticOp::Add, lhs, rhs)
    }

    pub fn sub(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::operation(ArithmeticOp::Sub, lhs, rhs)
    }

    pub fn mul(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::operation(ArithmeticOp::Mul, lhs, rhs)
    }

    pub fn div(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::operation(ArithmeticOp::Div, lhs, rhs)
    }

    pub fn eq(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::eq(lhs, rhs)
    }

    pub fn ne(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::ne(lhs, rhs)
    }

    pub fn lt(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::lt(lhs, rhs)
    }

    pub fn le(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::le(lhs, rhs)
    }

    pub fn gt(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::gt(lhs, rhs)
    }

    pub fn ge(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::ge(lhs, rhs)
    }

    pub fn like(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::like(lhs, rhs)
    }

    /// `lhs in (values...)`.
    pub fn contains<I, V>(&self, lhs: impl Into<Expr>, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        expr::contains(lhs, values)
    }

    pub fn and(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::and(lhs, rhs)
    }

    pub fn or(&self, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        expr::or(lhs, rhs)
    }

    /// Join two tables into a selectable table named
    /// `<left> <direction> join <right>[ as <alias>] on <predicate>`.
    ///
    /// Columns are copied with `table.column` names (the alias replaces the
    /// right table's prefix) and carry no constraints.
    pub fn join(
        &self,
        left: &Table,
        right: &Table,
        on: Expr,
        direction: JoinDirection,
        alias: Option<&str>,
    ) -> Result<Table> {
        if !on.is_comparison() {
            return Err(Error::StructuralField(format!(
                "join predicate must be a comparison, got {}",
                on.dtype().unwrap_or("an operand")
            )));
        }

        let mut name = format!("{} {direction} join {}", left.name(), right.name());
        if let Some(alias) = alias {
            name.push_str(&format!(" as {}", self.dialect.quote_identifier(alias)));
        }
        name.push_str(&format!(" on {}", self.render(&on)));

        let right_prefix = alias.unwrap_or(right.name());
        let columns = left
            .columns()
            .iter()
            .map(|column| joined_column(left.name(), column))
            .chain(
                right
                    .columns()
                    .iter()
                    .map(|column| joined_column(right_prefix, column)),
            )
            .collect();
        Table::new_joined(name, columns)
    }
}

fn joined_column(prefix: &str, column: &Column) -> Column {
    let name = if column.name.contains('.') {
        column.name.clone()
    } else {
        format!("{prefix}.{}", column.name)
    };
    let mut copy = Column::new(name, column.dtype.clone())
        .with_nullable(column.nullable)
        .with_visible(column.visible)
        .with_auto_increment(column.auto_increment)
        .with_comment(column.comment.clone());
    copy.default = column.default.clone();
    copy
}

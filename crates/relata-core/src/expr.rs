use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Sub};

use crate::column::Column;
use crate::constraints::ColumnKey;
use crate::value::Value;

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
        }
    }
}

/// Comparison and logical operators. Every one produces a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    And,
    Or,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Like => "like",
            ComparisonOp::In => "in",
            ComparisonOp::And => "and",
            ComparisonOp::Or => "or",
        }
    }
}

/// What an expression node produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    Operand,
    Operation,
    Comparison,
}

/// Expression tree built by the operator builders.
///
/// Derived nodes are `Operation` (arithmetic) or `Comparison` (predicates);
/// only comparisons are accepted as a `where` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnKey),
    Value(Value),
    List(Vec<Value>),
    Operation {
        op: ArithmeticOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Comparison {
        op: ComparisonOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn column(table: &str, column: &str) -> Self {
        Expr::Column(ColumnKey::new(Some(table), column))
    }

    pub fn operation(op: ArithmeticOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Operation {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn comparison(op: ComparisonOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Comparison {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Column(_) | Expr::Value(_) | Expr::List(_) => ExprKind::Operand,
            Expr::Operation { .. } => ExprKind::Operation,
            Expr::Comparison { .. } => ExprKind::Comparison,
        }
    }

    /// Pseudo type of a derived node: `operation` or `comparison`.
    pub fn dtype(&self) -> Option<&'static str> {
        match self.kind() {
            ExprKind::Operand => None,
            ExprKind::Operation => Some("operation"),
            ExprKind::Comparison => Some("comparison"),
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.kind() == ExprKind::Comparison
    }

    /// Every column referenced anywhere in the tree.
    pub fn columns(&self) -> Vec<&ColumnKey> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnKey>) {
        match self {
            Expr::Column(key) => out.push(key),
            Expr::Value(_) | Expr::List(_) => {}
            Expr::Operation { lhs, rhs, .. } | Expr::Comparison { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
        }
    }

    /// Render as `(lhs op rhs)`, formatting values with `literal`.
    pub fn render(&self, literal: &dyn Fn(&Value) -> String) -> String {
        self.render_with(&ColumnKey::qualified, literal)
    }

    /// Like [`Expr::render`], with column references formatted by `column`.
    pub fn render_with(
        &self,
        column: &dyn Fn(&ColumnKey) -> String,
        literal: &dyn Fn(&Value) -> String,
    ) -> String {
        match self {
            Expr::Column(key) => column(key),
            Expr::Value(value) => literal(value),
            Expr::List(values) => {
                let items: Vec<String> = values.iter().map(literal).collect();
                format!("({})", items.join(", "))
            }
            Expr::Operation { op, lhs, rhs } => format!(
                "({} {} {})",
                lhs.render_with(column, literal),
                op.symbol(),
                rhs.render_with(column, literal)
            ),
            Expr::Comparison { op, lhs, rhs } => format!(
                "({} {} {})",
                lhs.render_with(column, literal),
                op.symbol(),
                rhs.render_with(column, literal)
            ),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = |value: &Value| match value {
            Value::Text(text) => format!("'{text}'"),
            other => other.to_string(),
        };
        f.write_str(&self.render(&plain))
    }
}

impl From<&Column> for Expr {
    fn from(column: &Column) -> Self {
        Expr::Column(column.key())
    }
}

impl From<ColumnKey> for Expr {
    fn from(key: ColumnKey) -> Self {
        Expr::Column(key)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Expr {
    fn from(value: Option<T>) -> Self {
        Expr::Value(value.into())
    }
}

macro_rules! literal_impl {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Value(value.into())
                }
            }
        )*
    };
}

literal_impl!(bool, i32, i64, u32, u64, f64, &str, String);

macro_rules! arithmetic_impl {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::operation($op, self, rhs)
            }
        }
    };
}

arithmetic_impl!(Add, add, ArithmeticOp::Add);
arithmetic_impl!(Sub, sub, ArithmeticOp::Sub);
arithmetic_impl!(Mul, mul, ArithmeticOp::Mul);
arithmetic_impl!(Div, div, ArithmeticOp::Div);

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        Expr::comparison(ComparisonOp::And, self, rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        Expr::comparison(ComparisonOp::Or, self, rhs)
    }
}

/// `(lhs = rhs)`; an absent operand becomes `NULL`.
pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Eq, lhs, rhs)
}

pub fn ne(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Ne, lhs, rhs)
}

pub fn lt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Lt, lhs, rhs)
}

pub fn le(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Le, lhs, rhs)
}

pub fn gt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Gt, lhs, rhs)
}

pub fn ge(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Ge, lhs, rhs)
}

/// `(lhs like rhs)`; an absent pattern becomes `NULL`.
pub fn like(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Like, lhs, rhs)
}

/// `(lhs in (v, ...))`.
pub fn contains<I, V>(lhs: impl Into<Expr>, values: I) -> Expr
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Expr::comparison(
        ComparisonOp::In,
        lhs,
        Expr::List(values.into_iter().map(Into::into).collect()),
    )
}

pub fn and(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::And, lhs, rhs)
}

pub fn or(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::comparison(ComparisonOp::Or, lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_nest_in_parentheses() {
        let price = Expr::column("items", "price");
        let qty = Expr::column("items", "qty");
        let predicate = gt(price * qty, 100) & eq(Expr::column("items", "note"), None::<String>);
        assert_eq!(
            predicate.to_string(),
            "(((items.price * items.qty) > 100) and (items.note = NULL))"
        );
        assert_eq!(predicate.dtype(), Some("comparison"));
    }

    #[test]
    fn arithmetic_is_not_a_predicate() {
        let sum = Expr::column("t", "a") + 1;
        assert_eq!(sum.kind(), ExprKind::Operation);
        assert!(!sum.is_comparison());
        assert_eq!(sum.columns().len(), 1);
    }

    #[test]
    fn in_renders_a_list() {
        let predicate = contains(Expr::column("t", "id"), [1, 2, 3]);
        assert_eq!(predicate.to_string(), "(t.id in (1, 2, 3))");
    }
}

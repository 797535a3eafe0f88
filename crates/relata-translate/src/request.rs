use std::sync::Arc;

use serde::Serialize;

use relata_core::{Column, ColumnRef, Constraint, Expr, Named, Row, Table, Value};

/// Target table: a registry name or a table value (joins, new tables).
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Name(String),
    Table(Arc<Table>),
}

impl TableRef {
    pub fn name(&self) -> &str {
        match self {
            TableRef::Name(name) => name,
            TableRef::Table(table) => table.name(),
        }
    }
}

impl From<&str> for TableRef {
    fn from(value: &str) -> Self {
        TableRef::Name(value.to_string())
    }
}

impl From<String> for TableRef {
    fn from(value: String) -> Self {
        TableRef::Name(value)
    }
}

impl From<Table> for TableRef {
    fn from(value: Table) -> Self {
        TableRef::Table(Arc::new(value))
    }
}

impl From<Arc<Table>> for TableRef {
    fn from(value: Arc<Table>) -> Self {
        TableRef::Table(value)
    }
}

/// Method payload. Which shape is expected depends on the method.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Fields {
    #[default]
    None,
    /// Every column (`*`).
    All,
    /// One column, column definition, or new table name.
    Column(ColumnRef),
    Columns(Vec<ColumnRef>),
    /// Ordered column → value mapping for insert and update.
    Values(Vec<(ColumnRef, Value)>),
    /// Single-entry old → new mapping for alter column.
    Change(ColumnRef, ColumnRef),
    Constraint(Constraint),
}

impl Fields {
    /// Build a value mapping from `(column, value)` pairs.
    pub fn values<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ColumnRef>,
        V: Into<Value>,
    {
        Fields::Values(
            pairs
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        )
    }

    /// Build a column list.
    pub fn columns<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Fields::Columns(columns.into_iter().map(Into::into).collect())
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Fields::None => "nothing",
            Fields::All => "all",
            Fields::Column(_) => "a column",
            Fields::Columns(_) => "a column list",
            Fields::Values(_) => "a value mapping",
            Fields::Change(_, _) => "a column change",
            Fields::Constraint(_) => "a constraint",
        }
    }
}

/// `"all"` and `"*"` select every column; any other string is a column reference.
impl From<&str> for Fields {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") || value == "*" {
            Fields::All
        } else {
            Fields::Column(ColumnRef::from(value))
        }
    }
}

impl From<Column> for Fields {
    fn from(value: Column) -> Self {
        Fields::Column(ColumnRef::Column(value))
    }
}

impl From<&Column> for Fields {
    fn from(value: &Column) -> Self {
        Fields::Column(ColumnRef::from(value))
    }
}

impl From<ColumnRef> for Fields {
    fn from(value: ColumnRef) -> Self {
        Fields::Column(value)
    }
}

impl From<Constraint> for Fields {
    fn from(value: Constraint) -> Self {
        Fields::Constraint(value)
    }
}

/// Optional clauses and flags. Methods ignore the ones they do not use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub where_clause: Option<Expr>,
    pub limit: Option<i64>,
    pub group_by: Option<ColumnRef>,
    pub order_by: Option<ColumnRef>,
    pub temporary: bool,
    /// Create without `if not exists`.
    pub clobber: bool,
    /// Column after which a new column goes, or `first`.
    pub after: Option<ColumnRef>,
    /// New definition for alter column.
    pub to: Option<ColumnRef>,
    /// Referenced column for foreign keys, `table.column` or an owned column.
    pub foreign: Option<ColumnRef>,
    /// Constraint name.
    pub name: Option<String>,
    /// Truncate row results to this many rows.
    pub max_rows: Option<usize>,
}

impl Modifiers {
    pub fn with_where(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_group_by(mut self, column: impl Into<ColumnRef>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn with_order_by(mut self, column: impl Into<ColumnRef>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn with_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    pub fn with_clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }

    pub fn with_after(mut self, column: impl Into<ColumnRef>) -> Self {
        self.after = Some(column.into());
        self
    }

    pub fn with_to(mut self, definition: impl Into<ColumnRef>) -> Self {
        self.to = Some(definition.into());
        self
    }

    pub fn with_foreign(mut self, column: impl Into<ColumnRef>) -> Self {
        self.foreign = Some(column.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// One semantic database operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub table: TableRef,
    pub fields: Fields,
    pub modifiers: Modifiers,
}

impl Request {
    pub fn new(method: impl Into<String>, table: impl Into<TableRef>) -> Self {
        Self {
            method: method.into(),
            table: table.into(),
            fields: Fields::None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Typed result of an interpreted response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// Mutations, or a response with no rows at all.
    Empty,
    Scalar(Value),
    Names(Vec<String>),
    Rows(Vec<Row>),
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutput::Empty)
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutput::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn into_names(self) -> Vec<String> {
        match self {
            QueryOutput::Names(names) => names,
            _ => Vec::new(),
        }
    }

    pub fn into_scalar(self) -> Option<Value> {
        match self {
            QueryOutput::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

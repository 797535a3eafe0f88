use std::collections::HashSet;

use crate::column::{Column, ColumnRef};
use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::Named;

/// An ordered, named collection of columns plus table-level flags.
///
/// Tables handed out by a database are immutable snapshots; schema changes
/// build a new table and swap it into the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    temporary: bool,
    comment: String,
    auto_increment: Option<u64>,
    joined: bool,
}

impl Table {
    /// Build a table, taking ownership of `columns`. Column names must be unique.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        {
            let mut seen = HashSet::new();
            for column in &columns {
                if !seen.insert(column.name.as_str()) {
                    return Err(Error::SemanticField(format!(
                        "duplicate column name: {name}.{}",
                        column.name
                    )));
                }
            }
        }

        let mut columns = columns;
        for column in &mut columns {
            column.set_owner(&name);
        }

        Ok(Self {
            name,
            columns,
            temporary: false,
            comment: String::new(),
            auto_increment: None,
            joined: false,
        })
    }

    /// Build a table from column definition strings, as `describe` returns them.
    pub fn from_definitions<S: AsRef<str>>(name: impl Into<String>, definitions: &[S]) -> Result<Self> {
        let columns = definitions
            .iter()
            .map(|definition| Column::from_definition(definition.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, columns)
    }

    /// Build the result of a join. Column names are expected to be qualified.
    pub fn new_joined(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new(name, columns)?;
        table.joined = true;
        Ok(table)
    }

    pub fn with_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_auto_increment(mut self, seed: Option<u64>) -> Self {
        self.auto_increment = seed;
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Every constraint attached to any column, in column order.
    pub fn constraints(&self) -> Vec<&Constraint> {
        self.columns
            .iter()
            .flat_map(|column| column.constraints())
            .collect()
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn auto_increment(&self) -> Option<u64> {
        self.auto_increment
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Resolve a column by bare name, or by `table.column` with this table's prefix.
    pub fn column(&self, name: &str) -> Option<&Column> {
        if let Some(column) = self.columns.iter().find(|column| column.name == name) {
            return Some(column);
        }
        let bare = name
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))?;
        self.columns.iter().find(|column| column.name == bare)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|column| column.name == name)
    }

    /// Resolve a reference: identity first, then bare name, then qualified name.
    ///
    /// A column value resolves only if this table owns an identical column,
    /// or (for joins) if its qualified name is one of this table's columns.
    pub fn get_column(&self, reference: &ColumnRef) -> Option<&Column> {
        match reference {
            ColumnRef::Column(wanted) => self
                .columns
                .iter()
                .find(|column| {
                    column.table() == wanted.table()
                        && column.name == wanted.name
                        && column.dtype == wanted.dtype
                })
                .or_else(|| self.column(&wanted.qualified_name()).filter(|_| self.joined)),
            ColumnRef::Name(name) => self.column(name),
        }
    }
}

impl Named for Table {
    fn name(&self) -> &str {
        &self.name
    }
}

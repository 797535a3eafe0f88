//! Named shortcuts over [`Database::query`].

use std::sync::Arc;

use relata_core::{Column, ColumnRef, Constraint, Error, Expr, Named, Result, Row, Table, Value};
use relata_translate::{Dialect, Fields, JoinDirection, Modifiers, TableRef};

use crate::database::Database;
use crate::executor::Connector;

impl<D: Dialect, C: Connector> Database<D, C> {
    pub fn select(
        &mut self,
        table: impl Into<TableRef>,
        fields: impl Into<Fields>,
        modifiers: Modifiers,
    ) -> Result<Vec<Row>> {
        Ok(self.query("select", table, fields, modifiers)?.into_rows())
    }

    pub fn distinct(
        &mut self,
        table: impl Into<TableRef>,
        fields: impl Into<Fields>,
        modifiers: Modifiers,
    ) -> Result<Vec<Row>> {
        Ok(self.query("distinct", table, fields, modifiers)?.into_rows())
    }

    /// Row count; `0` when the engine returns no row.
    pub fn count(&mut self, table: impl Into<TableRef>, modifiers: Modifiers) -> Result<Value> {
        Ok(self
            .query("count", table, Fields::None, modifiers)?
            .into_scalar()
            .unwrap_or(Value::Int(0)))
    }

    pub fn insert(&mut self, table: &str, values: Fields) -> Result<()> {
        self.query("insert", table, values, Modifiers::default())?;
        Ok(())
    }

    /// Insert after running every constraint of each named column.
    pub fn insert_checked(&mut self, table: &str, values: Fields) -> Result<()> {
        if let Fields::Values(pairs) = &values {
            for (column, value) in pairs {
                self.check_value(table, column.name(), value)?;
            }
        }
        self.insert(table, values)
    }

    pub fn update(&mut self, table: &str, values: Fields, filter: Option<Expr>) -> Result<()> {
        let modifiers = Modifiers {
            where_clause: filter,
            ..Modifiers::default()
        };
        self.query("update", table, values, modifiers)?;
        Ok(())
    }

    pub fn delete(&mut self, table: &str, filter: Option<Expr>) -> Result<()> {
        let modifiers = Modifiers {
            where_clause: filter,
            ..Modifiers::default()
        };
        self.query("delete", table, Fields::None, modifiers)?;
        Ok(())
    }

    /// Create a table from definitions (or a table value) and return its snapshot.
    pub fn make_table(
        &mut self,
        table: impl Into<TableRef>,
        columns: impl Into<Fields>,
        temporary: bool,
        clobber: bool,
    ) -> Result<Arc<Table>> {
        let table = table.into();
        let name = table.name().to_string();
        let modifiers = Modifiers::default()
            .with_temporary(temporary)
            .with_clobber(clobber);
        self.query("create table", table, columns, modifiers)?;
        self.require_table(&name)
    }

    pub fn move_table(&mut self, old: &str, new: &str) -> Result<Arc<Table>> {
        self.query("rename table", old, new, Modifiers::default())?;
        self.require_table(new)
    }

    pub fn truncate_table(&mut self, table: &str) -> Result<()> {
        self.query("truncate", table, Fields::None, Modifiers::default())?;
        Ok(())
    }

    pub fn drop_table(&mut self, table: &str, temporary: bool) -> Result<()> {
        let modifiers = Modifiers::default().with_temporary(temporary);
        self.query("drop table", table, Fields::None, modifiers)?;
        Ok(())
    }

    /// Add a column, optionally `after` another one (or `"first"`).
    pub fn add_column(
        &mut self,
        table: &str,
        column: impl Into<ColumnRef>,
        after: Option<ColumnRef>,
    ) -> Result<Arc<Table>> {
        let modifiers = Modifiers {
            after,
            ..Modifiers::default()
        };
        self.query("add column", table, Fields::Column(column.into()), modifiers)?;
        self.require_table(table)
    }

    pub fn drop_column(&mut self, table: &str, column: impl Into<ColumnRef>) -> Result<Arc<Table>> {
        self.query("drop column", table, Fields::Column(column.into()), Modifiers::default())?;
        self.require_table(table)
    }

    /// Replace `old` with the definition `new`.
    pub fn alter_column(
        &mut self,
        table: &str,
        old: impl Into<ColumnRef>,
        new: impl Into<ColumnRef>,
    ) -> Result<Arc<Table>> {
        let modifiers = Modifiers::default().with_to(new);
        self.query("alter column", table, Fields::Column(old.into()), modifiers)?;
        self.require_table(table)
    }

    pub fn add_index(
        &mut self,
        table: &str,
        column: impl Into<ColumnRef>,
        name: Option<&str>,
    ) -> Result<Arc<Table>> {
        self.add_constraint("add index", table, column.into(), None, name)
    }

    pub fn add_unique(
        &mut self,
        table: &str,
        column: impl Into<ColumnRef>,
        name: Option<&str>,
    ) -> Result<Arc<Table>> {
        self.add_constraint("add unique", table, column.into(), None, name)
    }

    pub fn add_primary_key(
        &mut self,
        table: &str,
        column: impl Into<ColumnRef>,
        name: Option<&str>,
    ) -> Result<Arc<Table>> {
        self.add_constraint("add primary key", table, column.into(), None, name)
    }

    /// Reference `foreign` (`table.column` or an owned column) from `column`.
    pub fn add_foreign_key(
        &mut self,
        table: &str,
        column: impl Into<ColumnRef>,
        foreign: impl Into<ColumnRef>,
        name: Option<&str>,
    ) -> Result<Arc<Table>> {
        self.add_constraint("add foreign key", table, column.into(), Some(foreign.into()), name)
    }

    pub fn drop_constraint(&mut self, table: &str, constraint: Constraint) -> Result<Arc<Table>> {
        self.query("drop constraint", table, constraint, Modifiers::default())?;
        self.require_table(table)
    }

    /// Join two registry tables; the result can be selected and counted.
    pub fn join(
        &self,
        left: &str,
        right: &str,
        on: Expr,
        direction: JoinDirection,
        alias: Option<&str>,
    ) -> Result<Table> {
        let left = self.require_table(left)?;
        let right = self.require_table(right)?;
        self.translator().join(&left, &right, on, direction, alias)
    }

    /// Column snapshot by table and column name.
    pub fn get_column(&self, table: &str, column: &str) -> Option<Column> {
        self.get_table(table)?.column(column).cloned()
    }

    /// Whether `column` could be added to `table`: it parses, its type is
    /// known to the dialect and the table has no column of that name.
    pub fn is_valid_column(&self, table: &str, column: impl Into<ColumnRef>) -> bool {
        let Some(table) = self.get_table(table) else {
            return false;
        };
        let column: ColumnRef = column.into();
        let Ok(column) = column.to_column() else {
            return false;
        };
        self.translator().dialect().is_valid_dtype(&column.dtype)
            && table.column(&column.name).is_none()
    }

    /// Run every constraint on `table.column` against `value`.
    ///
    /// Foreign keys are checked only on the referencing side.
    pub fn check_value(&mut self, table: &str, column: &str, value: &Value) -> Result<()> {
        let snapshot = self.require_table(table)?;
        let column = snapshot.column(column).ok_or_else(|| {
            Error::SemanticField(format!("unknown column {column} in {}", snapshot.name()))
        })?;
        let key = column.key();
        for constraint in column.constraints() {
            if let Constraint::ForeignKey(fk) = constraint {
                if fk.target() != &key {
                    continue;
                }
            }
            constraint.validate(value, &mut *self)?;
        }
        Ok(())
    }

    fn add_constraint(
        &mut self,
        method: &str,
        table: &str,
        column: ColumnRef,
        foreign: Option<ColumnRef>,
        name: Option<&str>,
    ) -> Result<Arc<Table>> {
        let modifiers = Modifiers {
            foreign,
            name: name.map(str::to_string),
            ..Modifiers::default()
        };
        self.query(method, table, column, modifiers)?;
        self.require_table(table)
    }
}

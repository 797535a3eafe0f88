use std::sync::Arc;

use tracing::{debug, info};

use relata_core::{Constraint, Error, Named, Result, Row, RowSource, Table};
use relata_translate::{
    Catalog, ConstraintKind, Dialect, Fields, Method, Modifiers, QueryOutput, Request, TableRef,
    Translator,
};

use crate::executor::{Connector, ExecOptions, Executor};

/// A named database: one connection, a table registry and a translator.
///
/// The registry holds `Arc<Table>` snapshots. Schema changes describe the
/// affected table again and swap the new snapshot in by name; tables
/// handed out earlier keep their old contents.
pub struct Database<D, C: Connector> {
    name: String,
    connector: C,
    executor: Option<C::Executor>,
    tables: Vec<Arc<Table>>,
    translator: Translator<D>,
}

impl<D: Dialect, C: Connector> Database<D, C> {
    /// A closed database. Call [`Database::connect`] before querying.
    pub fn new(name: impl Into<String>, dialect: D, connector: C) -> Self {
        Self {
            name: name.into(),
            connector,
            executor: None,
            tables: Vec::new(),
            translator: Translator::new(dialect),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.executor
            .as_ref()
            .is_some_and(|executor| executor.is_open())
    }

    pub fn translator(&self) -> &Translator<D> {
        &self.translator
    }

    /// Current registry snapshots, in load order.
    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name()).collect()
    }

    /// Open the connection and load every table. No-op when already open.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        self.executor = Some(self.connector.connect()?);
        if let Err(err) = self.load_registry() {
            self.detach();
            return Err(err);
        }

        info!(
            event = "connection_opened",
            database = %self.name,
            tables = self.tables.len()
        );
        Ok(())
    }

    /// Close the connection and drop the registry. No-op when already closed.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut executor) = self.executor.take() else {
            return Ok(());
        };
        self.tables.clear();
        executor.close()?;
        info!(event = "connection_closed", database = %self.name);
        Ok(())
    }

    pub fn reconnect(&mut self) -> Result<()> {
        self.close()?;
        self.connect()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.open_executor()?.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.open_executor()?.rollback()
    }

    /// Validate, translate, execute and interpret one operation.
    ///
    /// Schema-changing methods then refresh the registry from the engine.
    pub fn query(
        &mut self,
        method: &str,
        table: impl Into<TableRef>,
        fields: impl Into<Fields>,
        modifiers: Modifiers,
    ) -> Result<QueryOutput> {
        self.submit(
            Request::new(method, table)
                .with_fields(fields)
                .with_modifiers(modifiers),
        )
    }

    /// [`Database::query`] for a prebuilt request.
    pub fn submit(&mut self, request: Request) -> Result<QueryOutput> {
        self.translator.validate_and_raise(&*self, &request)?;
        let text = self.translator.translate(&*self, &request)?;
        let method = Method::parse(&request.method)?;

        let options = ExecOptions {
            expects_rows: method.returns_rows(),
            max_rows: request.modifiers.max_rows,
        };
        let raw = self.run(&text, &options)?;
        info!(
            event = "query_executed",
            method = method.keyword(),
            table = %request.table.name(),
            rows = raw.as_ref().map_or(0, Vec::len)
        );

        let output = self.translator.interpret(&request, raw)?;
        if method.is_schema_change() {
            self.apply_schema_change(method, &request)?;
        }
        Ok(output)
    }

    /// Registry snapshot of a table by name.
    pub fn get_table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables
            .iter()
            .find(|table| table.name() == name)
            .map(Arc::clone)
    }

    pub(crate) fn require_table(&self, name: &str) -> Result<Arc<Table>> {
        self.get_table(name)
            .ok_or_else(|| Error::InvalidTableReference(format!("unknown table: {name}")))
    }

    fn open_executor(&mut self) -> Result<&mut C::Executor> {
        self.executor
            .as_mut()
            .filter(|executor| executor.is_open())
            .ok_or(Error::ConnectionNotOpen)
    }

    fn run(&mut self, text: &str, options: &ExecOptions) -> Result<Option<Vec<Row>>> {
        debug!(event = "statement_sent", text = %text, expects_rows = options.expects_rows);
        self.open_executor()?.execute(text, options)
    }

    fn detach(&mut self) {
        self.tables.clear();
        if let Some(mut executor) = self.executor.take() {
            if let Err(err) = executor.close() {
                debug!(event = "close_failed", error = %err);
            }
        }
    }

    fn load_registry(&mut self) -> Result<()> {
        let text = self.translator.show_tables_text()?;
        let raw = self.run(&text, &ExecOptions::rows())?;
        let names = self
            .translator
            .interpret(&Request::new("show tables", ""), raw)?
            .into_names();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            tables.push(Arc::new(self.describe_table(&name)?));
        }
        self.tables = tables;
        Ok(())
    }

    /// Read a table's current definition from the engine.
    fn describe_table(&mut self, name: &str) -> Result<Table> {
        let text = self.translator.describe_text(name)?;
        let raw = self.run(&text, &ExecOptions::rows())?;
        let definitions = self
            .translator
            .interpret(&Request::new("describe", name), raw)?
            .into_names();
        Table::from_definitions(name, &definitions)
    }

    /// Swap a snapshot in by name, or append it.
    fn replace_table(&mut self, table: Table) {
        debug!(
            event = "table_refreshed",
            table = %table.name(),
            columns = table.columns().len()
        );
        let table = Arc::new(table);
        match self
            .tables
            .iter()
            .position(|current| current.name() == table.name())
        {
            Some(index) => self.tables[index] = table,
            None => self.tables.push(table),
        }
    }

    fn remove_table(&mut self, name: &str) -> Option<Arc<Table>> {
        let index = self.tables.iter().position(|table| table.name() == name)?;
        Some(self.tables.remove(index))
    }

    /// Describe `name` again, keeping foreign keys the engine does not report.
    fn refresh_table(&mut self, name: &str, dropped: Option<&Constraint>) -> Result<()> {
        let previous = self.get_table(name);
        let mut table = self.describe_table(name)?;
        if let Some(previous) = previous {
            table = table.with_temporary(previous.is_temporary());
            carry_foreign_keys(&previous, &mut table, dropped);
        }
        self.replace_table(table);
        Ok(())
    }

    fn apply_schema_change(&mut self, method: Method, request: &Request) -> Result<()> {
        let name = request.table.name().to_string();
        match method {
            Method::DropTable { .. } => {
                self.remove_table(&name);
                debug!(event = "table_dropped", table = %name);
            }
            Method::RenameTable => {
                let Fields::Column(new_name) = &request.fields else {
                    return Err(Error::Internal("rename without a new name".to_string()));
                };
                let temporary = self
                    .remove_table(&name)
                    .is_some_and(|previous| previous.is_temporary());
                let table = self
                    .describe_table(new_name.name())?
                    .with_temporary(temporary);
                self.replace_table(table);
            }
            Method::CreateTable { temporary, .. } => {
                let temporary = temporary
                    || request.modifiers.temporary
                    || matches!(&request.table, TableRef::Table(table) if table.is_temporary());
                let table = self.describe_table(&name)?.with_temporary(temporary);
                self.replace_table(table);
            }
            Method::AddConstraint(ConstraintKind::Foreign) => {
                let column = self.target_column(&name, &request.fields)?;
                let foreign = request.modifiers.foreign.as_ref().ok_or_else(|| {
                    Error::Internal("add foreign without a foreign column".to_string())
                })?;
                let (foreign_table, foreign_column) = foreign.split_qualified()?;
                self.refresh_table(&name, None)?;
                self.refresh_table(&foreign_table, None)?;
                self.link_foreign_key(
                    &name,
                    &column,
                    &foreign_table,
                    &foreign_column,
                    request.modifiers.name.as_deref(),
                )?;
            }
            Method::DropConstraint => {
                let Fields::Constraint(dropped) = &request.fields else {
                    return Err(Error::Internal("drop constraint without a constraint".to_string()));
                };
                self.refresh_table(&name, Some(dropped))?;
                if let Constraint::ForeignKey(fk) = dropped {
                    if let Some(foreign_table) = fk.foreign().table.as_deref() {
                        if foreign_table != name && self.get_table(foreign_table).is_some() {
                            self.refresh_table(foreign_table, Some(dropped))?;
                        }
                    }
                }
            }
            _ => self.refresh_table(&name, None)?,
        }
        Ok(())
    }

    fn target_column(&self, table: &str, fields: &Fields) -> Result<String> {
        let Fields::Column(reference) = fields else {
            return Err(Error::Internal("constraint without a column".to_string()));
        };
        let table = self.require_table(table)?;
        table
            .get_column(reference)
            .map(|column| column.name.clone())
            .ok_or_else(|| Error::SemanticField(format!("unknown column {}", reference.name())))
    }

    /// Record a foreign key on both registry snapshots.
    fn link_foreign_key(
        &mut self,
        table: &str,
        column: &str,
        foreign_table: &str,
        foreign_column: &str,
        name: Option<&str>,
    ) -> Result<()> {
        let mut target = Table::clone(&*self.require_table(table)?);
        let mut foreign = Table::clone(&*self.require_table(foreign_table)?);
        {
            let referenced = foreign.column_mut(foreign_column).ok_or_else(|| {
                Error::SemanticField(format!("unknown foreign column: {foreign_table}.{foreign_column}"))
            })?;
            let referencing = target.column_mut(column).ok_or_else(|| {
                Error::SemanticField(format!("unknown column {table}.{column}"))
            })?;
            referencing.add_foreign_key(referenced, name)?;
        }
        self.replace_table(target);
        self.replace_table(foreign);
        Ok(())
    }
}

/// Copy foreign keys from `previous` onto surviving columns of `table`.
fn carry_foreign_keys(previous: &Table, table: &mut Table, dropped: Option<&Constraint>) {
    for column in previous.columns() {
        let Some(current) = table.column_mut(&column.name) else {
            continue;
        };
        for constraint in column.constraints() {
            if matches!(constraint, Constraint::ForeignKey(_)) && Some(constraint) != dropped {
                current.attach_constraint(constraint.clone());
            }
        }
    }
}

impl<D: Dialect, C: Connector> Catalog for Database<D, C> {
    fn is_open(&self) -> bool {
        Database::is_open(self)
    }

    fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.get_table(name)
    }
}

impl<D: Dialect, C: Connector> RowSource for Database<D, C> {
    fn fetch(&mut self, table: &str, columns: &[String], distinct: bool) -> Result<Vec<Row>> {
        let method = if distinct { "distinct" } else { "select" };
        let fields = Fields::columns(columns.iter().map(String::as_str));
        Ok(self
            .query(method, table, fields, Modifiers::default())?
            .into_rows())
    }

    fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.get_table(name)
    }
}

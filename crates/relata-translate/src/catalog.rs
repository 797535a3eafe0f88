use std::sync::Arc;

use relata_core::{Named, Table};

/// Read view of a table registry used during validation.
pub trait Catalog {
    fn is_open(&self) -> bool;

    /// Current snapshot of the named table.
    fn table(&self, name: &str) -> Option<Arc<Table>>;
}

/// A fixed set of tables, for offline validation and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    open: bool,
    tables: Vec<Arc<Table>>,
}

impl MemoryCatalog {
    /// An open catalog holding `tables`.
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            open: true,
            tables: tables.into_iter().map(Arc::new).collect(),
        }
    }

    /// A catalog that reports a closed connection.
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        let table = Arc::new(table);
        match self.tables.iter().position(|t| t.name() == table.name()) {
            Some(index) => self.tables[index] = table,
            None => self.tables.push(table),
        }
    }
}

impl Catalog for MemoryCatalog {
    fn is_open(&self) -> bool {
        self.open
    }

    fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.iter().find(|table| table.name() == name).cloned()
    }
}

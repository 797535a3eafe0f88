use relata_core::{Result, Row};

/// Per-statement hints passed to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOptions {
    /// The statement produces a row set (select, count, describe, show tables).
    pub expects_rows: bool,
    /// Keep at most this many rows.
    pub max_rows: Option<usize>,
}

impl ExecOptions {
    pub fn rows() -> Self {
        Self {
            expects_rows: true,
            max_rows: None,
        }
    }
}

/// One open connection able to run query text.
///
/// Calls block until the engine answers. Transport failures surface as
/// [`relata_core::Error::Executor`].
pub trait Executor {
    /// Run one statement. `None` means the statement produced no row set.
    fn execute(&mut self, text: &str, options: &ExecOptions) -> Result<Option<Vec<Row>>>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Release the connection. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Opens executors; kept by the database so it can reconnect.
pub trait Connector {
    type Executor: Executor;

    fn connect(&mut self) -> Result<Self::Executor>;
}

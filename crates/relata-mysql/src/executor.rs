use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column as _, Connection, Row as _, TypeInfo as _, ValueRef as _};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use relata_core::{Error, Result, Row, Value};
use relata_db::{Connector, Database, ExecOptions, Executor};
use relata_translate::{value_from_text, MySql};

use crate::config::ConnectionConfig;

/// Column types whose cells are returned as raw bytes.
const BINARY_TYPES: &[&str] = &[
    "BINARY",
    "VARBINARY",
    "TINYBLOB",
    "BLOB",
    "MEDIUMBLOB",
    "LONGBLOB",
    "BIT",
    "GEOMETRY",
];

/// A database on a MySQL server.
pub type MySqlDatabase = Database<MySql, MySqlConnector>;

/// Build and connect a [`MySqlDatabase`] named after the configured schema.
pub fn open(config: ConnectionConfig) -> Result<MySqlDatabase> {
    let name = config.database.clone();
    let mut database = Database::new(name, MySql, MySqlConnector::new(config));
    database.connect()?;
    Ok(database)
}

/// Opens [`MySqlExecutor`]s for one configuration.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    config: ConnectionConfig,
}

impl MySqlConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Connector for MySqlConnector {
    type Executor = MySqlExecutor;

    fn connect(&mut self) -> Result<MySqlExecutor> {
        MySqlExecutor::connect(&self.config)
    }
}

/// One blocking MySQL connection, autocommit off.
///
/// Owns a current-thread runtime and drives each statement to completion
/// on it, so it must not be used from inside another tokio runtime.
pub struct MySqlExecutor {
    runtime: Runtime,
    connection: Option<MySqlConnection>,
}

impl MySqlExecutor {
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Error::Executor(format!("runtime: {err}")))?;

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database)
            .charset(&config.charset);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let mut connection = runtime
            .block_on(MySqlConnection::connect_with(&options))
            .map_err(executor_error)?;
        runtime
            .block_on(sqlx::raw_sql("set autocommit = 0").execute(&mut connection))
            .map_err(executor_error)?;

        info!(event = "mysql_connected", url = %config.redacted_url());
        Ok(Self {
            runtime,
            connection: Some(connection),
        })
    }

    fn run(&mut self, statement: &str) -> Result<()> {
        let connection = self.connection.as_mut().ok_or(Error::ConnectionNotOpen)?;
        self.runtime
            .block_on(sqlx::raw_sql(statement).execute(&mut *connection))
            .map_err(executor_error)?;
        Ok(())
    }
}

impl Executor for MySqlExecutor {
    fn execute(&mut self, text: &str, options: &ExecOptions) -> Result<Option<Vec<Row>>> {
        let connection = self.connection.as_mut().ok_or(Error::ConnectionNotOpen)?;

        if !options.expects_rows {
            let done = self
                .runtime
                .block_on(sqlx::raw_sql(text).execute(&mut *connection))
                .map_err(executor_error)?;
            debug!(event = "statement_executed", rows_affected = done.rows_affected());
            return Ok(None);
        }

        let raw = self
            .runtime
            .block_on(sqlx::raw_sql(text).fetch_all(&mut *connection))
            .map_err(executor_error)?;
        let keep = options.max_rows.unwrap_or(raw.len());
        let rows = raw
            .iter()
            .take(keep)
            .map(decode_row)
            .collect::<Result<Vec<_>>>()?;
        debug!(event = "rows_fetched", rows = rows.len(), total = raw.len());
        Ok(Some(rows))
    }

    fn commit(&mut self) -> Result<()> {
        self.run("commit")
    }

    fn rollback(&mut self) -> Result<()> {
        self.run("rollback")
    }

    fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            self.runtime
                .block_on(connection.close())
                .map_err(executor_error)?;
            info!(event = "mysql_closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}

/// Text-protocol row → [`Row`], typed by each column's MySQL type.
fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let type_name = column.type_info().name();
        let is_null = row.try_get_raw(index).map_err(executor_error)?.is_null();

        let value = if is_null {
            Value::Null
        } else if BINARY_TYPES.contains(&type_name) {
            Value::Bytes(
                row.try_get_unchecked::<Vec<u8>, _>(index)
                    .map_err(executor_error)?,
            )
        } else {
            let text = row
                .try_get_unchecked::<String, _>(index)
                .map_err(executor_error)?;
            value_from_text(type_name, &text)
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

fn executor_error(err: sqlx::Error) -> Error {
    Error::Executor(err.to_string())
}

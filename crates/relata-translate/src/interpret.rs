use relata_core::{Result, Row, Value};

use crate::dialect::Dialect;
use crate::method::Method;
use crate::request::{QueryOutput, Request};

/// Shape a raw response according to the method that produced it.
///
/// A `None` response passes through as [`QueryOutput::Empty`] without
/// looking at the method.
pub(crate) fn interpret<D: Dialect + ?Sized>(
    dialect: &D,
    request: &Request,
    raw: Option<Vec<Row>>,
) -> Result<QueryOutput> {
    let Some(mut rows) = raw else {
        return Ok(QueryOutput::Empty);
    };

    let method = Method::parse(&request.method).map_err(|err| {
        relata_core::Error::Internal(format!("interpret called on an unvalidated method: {err}"))
    })?;

    let output = match method {
        Method::Count => QueryOutput::Scalar(
            rows.first()
                .and_then(Row::first)
                .cloned()
                .unwrap_or(Value::Int(0)),
        ),
        Method::ShowTables => QueryOutput::Names(
            rows.iter()
                .map(|row| dialect.table_name(row))
                .collect::<Result<Vec<_>>>()?,
        ),
        Method::Describe => QueryOutput::Names(
            rows.iter()
                .map(|row| dialect.describe_definition(row))
                .collect::<Result<Vec<_>>>()?,
        ),
        Method::Select | Method::Distinct => {
            if let Some(max_rows) = request.modifiers.max_rows {
                rows.truncate(max_rows);
            }
            QueryOutput::Rows(rows)
        }
        _ => QueryOutput::Empty,
    };
    Ok(output)
}

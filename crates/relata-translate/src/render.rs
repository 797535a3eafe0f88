use relata_core::{ColumnKey, ColumnRef, Error, Expr, ForeignKey, Named, Result, Table, Value};

use crate::dialect::{ConstraintClause, Dialect};
use crate::method::{ConstraintKind, Method};
use crate::request::{Fields, Modifiers, Request, TableRef};
use crate::validate::{
    create_definitions, is_all, is_first, planned_columns, resolve_column, Resolved,
};

/// Render a validated request. Lookups that fail here mean validation was skipped.
pub(crate) fn translate<D: Dialect + ?Sized>(
    dialect: &D,
    resolved: &Resolved,
    request: &Request,
) -> Result<String> {
    let method = resolved.method;
    let fields = &request.fields;
    let modifiers = &request.modifiers;
    let name = table_sql(dialect, &request.table);

    let text = match method {
        Method::Select | Method::Distinct | Method::Count => {
            let table = resolved.table()?;
            let projection = match (method, fields) {
                (Method::Count, Fields::Column(reference)) if !is_all(reference) => {
                    format!("count({})", column_sql(dialect, table, reference)?)
                }
                (Method::Count, _) => "count(*)".to_string(),
                (_, Fields::Column(reference)) if !is_all(reference) => {
                    column_sql(dialect, table, reference)?
                }
                (_, Fields::Columns(references)) => references
                    .iter()
                    .map(|reference| column_sql(dialect, table, reference))
                    .collect::<Result<Vec<_>>>()?
                    .join(", "),
                _ => "*".to_string(),
            };
            let distinct = if method == Method::Distinct { "distinct " } else { "" };
            let clauses = clauses(dialect, method, table, modifiers)?;
            format!("select {distinct}{projection} from {name}{clauses};")
        }
        Method::Insert => {
            let table = resolved.table()?;
            let values = values(fields)?;
            let mut columns = Vec::with_capacity(values.len());
            let mut literals = Vec::with_capacity(values.len());
            for (reference, value) in values {
                columns.push(column_sql(dialect, table, reference)?);
                literals.push(dialect.literal(value));
            }
            format!(
                "insert into {name} ({}) values ({});",
                columns.join(", "),
                literals.join(", ")
            )
        }
        Method::Update => {
            let table = resolved.table()?;
            let assignments = values(fields)?
                .iter()
                .map(|(reference, value)| {
                    Ok(format!(
                        "{} = {}",
                        column_sql(dialect, table, reference)?,
                        dialect.literal(value)
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            let clauses = clauses(dialect, method, table, modifiers)?;
            format!("update {name} set {}{clauses};", assignments.join(", "))
        }
        Method::Delete => {
            let clauses = clauses(dialect, method, resolved.table()?, modifiers)?;
            format!("delete from {name}{clauses};")
        }
        Method::CreateTable {
            temporary,
            if_not_exists,
        } => {
            let temporary = temporary
                || modifiers.temporary
                || matches!(&request.table, TableRef::Table(table) if table.is_temporary());
            let definitions = match fields {
                Fields::Column(_) | Fields::Columns(_) => create_definitions(fields)?
                    .iter()
                    .map(ColumnRef::to_definition)
                    .collect::<Result<Vec<_>>>()?,
                _ => planned_columns(request)?
                    .iter()
                    .map(|column| column.to_definition())
                    .collect(),
            };
            let guarded = if_not_exists || !modifiers.clobber;
            format!(
                "create {}table {name} {}({});",
                if temporary { "temporary " } else { "" },
                if guarded { "if not exists " } else { "" },
                definitions.join(", ")
            )
        }
        Method::DropTable { temporary } => {
            let temporary = temporary || modifiers.temporary;
            format!(
                "drop {}table {name} if exists;",
                if temporary { "temporary " } else { "" }
            )
        }
        Method::RenameTable => {
            let new_name = match fields {
                Fields::Column(reference) => reference.name(),
                _ => return Err(unvalidated(method)),
            };
            format!(
                "alter table {name} rename {};",
                dialect.quote_identifier(new_name)
            )
        }
        Method::Truncate => format!("truncate table {name};"),
        Method::Describe => format!("describe {name};"),
        Method::ShowTables => "show tables;".to_string(),
        Method::AddColumn => {
            let table = resolved.table()?;
            let Fields::Column(reference) = fields else {
                return Err(unvalidated(method));
            };
            let position = match &modifiers.after {
                Some(after) if is_first(after) => " first".to_string(),
                Some(after) => format!(" after {}", column_sql(dialect, table, after)?),
                None => String::new(),
            };
            format!(
                "alter table {name} add column {}{position};",
                reference.to_definition()?
            )
        }
        Method::DropColumn => {
            let table = resolved.table()?;
            let Fields::Column(reference) = fields else {
                return Err(unvalidated(method));
            };
            format!(
                "alter table {name} drop column {};",
                dialect.quote_identifier(&column_name(table, reference)?)
            )
        }
        Method::AlterColumn => {
            let table = resolved.table()?;
            let (old, to) = match (fields, &modifiers.to) {
                (Fields::Change(old, to), _) => (old, to),
                (Fields::Column(old), Some(to)) => (old, to),
                _ => return Err(unvalidated(method)),
            };
            format!(
                "alter table {name} change column {} {};",
                dialect.quote_identifier(&column_name(table, old)?),
                to.to_definition()?
            )
        }
        Method::AddConstraint(kind) => {
            let table = resolved.table()?;
            let Fields::Column(reference) = fields else {
                return Err(unvalidated(method));
            };
            let target = resolve_column(table, reference)?;
            let references = match (kind, &modifiers.foreign) {
                (ConstraintKind::Foreign, Some(foreign)) => Some(foreign.split_qualified()?),
                (ConstraintKind::Foreign, None) => return Err(unvalidated(method)),
                _ => None,
            };
            let default_name = references.as_ref().map(|(_, foreign_column)| {
                ForeignKey::default_name(
                    &target.key(),
                    &ColumnKey::new(None, foreign_column.clone()),
                )
            });
            let column = dialect.column_identifier(&target.name);
            let clause = ConstraintClause {
                kind,
                name: modifiers.name.as_deref().or(default_name.as_deref()),
                column: &column,
                references: references
                    .as_ref()
                    .map(|(table, column)| (table.as_str(), column.as_str())),
            };
            format!("alter table {name} {};", dialect.add_constraint_clause(&clause))
        }
        Method::DropConstraint => {
            let Fields::Constraint(constraint) = fields else {
                return Err(unvalidated(method));
            };
            format!(
                "alter table {name} {};",
                dialect.drop_constraint_clause(constraint)
            )
        }
    };

    Ok(text)
}

/// Quoted registry name, or the raw text of a join.
fn table_sql<D: Dialect + ?Sized>(dialect: &D, reference: &TableRef) -> String {
    match reference {
        TableRef::Table(table) if table.is_joined() => table.name().to_string(),
        _ => dialect.quote_identifier(reference.name()),
    }
}

/// Optional clauses in fixed order: where, group by, order by, limit.
fn clauses<D: Dialect + ?Sized>(
    dialect: &D,
    method: Method,
    table: &Table,
    modifiers: &Modifiers,
) -> Result<String> {
    let mut out = String::new();
    if method.accepts_where() {
        if let Some(predicate) = &modifiers.where_clause {
            out.push_str(" where ");
            out.push_str(&render_expr(dialect, predicate));
        }
    }
    if method.accepts_group_by() {
        if let Some(column) = &modifiers.group_by {
            out.push_str(" group by ");
            out.push_str(&dialect.qualified_column(&resolve_column(table, column)?.key()));
        }
    }
    if method.accepts_order_by() {
        if let Some(column) = &modifiers.order_by {
            out.push_str(" order by ");
            out.push_str(&dialect.qualified_column(&resolve_column(table, column)?.key()));
        }
    }
    if method.accepts_limit() {
        if let Some(limit) = modifiers.limit {
            out.push_str(&format!(" limit {limit}"));
        }
    }
    Ok(out)
}

pub(crate) fn render_expr<D: Dialect + ?Sized>(dialect: &D, expr: &Expr) -> String {
    expr.render_with(
        &|key: &ColumnKey| dialect.qualified_column(key),
        &|value: &Value| dialect.literal(value),
    )
}

fn column_name(table: &Table, reference: &ColumnRef) -> Result<String> {
    Ok(resolve_column(table, reference)?.name.clone())
}

fn column_sql<D: Dialect + ?Sized>(
    dialect: &D,
    table: &Table,
    reference: &ColumnRef,
) -> Result<String> {
    let name = column_name(table, reference)?;
    Ok(dialect.qualified_column(&ColumnKey::new(None, name)))
}

fn values(fields: &Fields) -> Result<&[(ColumnRef, Value)]> {
    match fields {
        Fields::Values(values) => Ok(values),
        _ => Err(Error::Internal("expected a value mapping".to_string())),
    }
}

fn unvalidated(method: Method) -> Error {
    Error::Internal(format!(
        "{} called with fields that were never validated",
        method.keyword()
    ))
}

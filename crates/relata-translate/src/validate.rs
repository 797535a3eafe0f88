use std::collections::HashSet;
use std::sync::Arc;

use relata_core::{
    check_name_len, Column, ColumnRef, Error, ForeignKey, Named, Result, Table,
};

use crate::catalog::Catalog;
use crate::dialect::Dialect;
use crate::method::{ConstraintKind, Method};
use crate::request::{Fields, Request, TableRef};

/// Method plus the registry snapshot of its table (`None` for create and show tables).
pub(crate) struct Resolved {
    pub method: Method,
    pub table: Option<Arc<Table>>,
}

impl Resolved {
    pub fn table(&self) -> Result<&Table> {
        self.table
            .as_deref()
            .ok_or_else(|| Error::Internal(format!("{} has no table", self.method.keyword())))
    }
}

/// Open connection, then method keyword, then table reference.
pub(crate) fn resolve(catalog: &dyn Catalog, request: &Request) -> Result<Resolved> {
    if !catalog.is_open() {
        return Err(Error::ConnectionNotOpen);
    }
    let method = Method::parse(&request.method)?;
    let table = resolve_table(catalog, method, &request.table)?;
    Ok(Resolved { method, table })
}

fn resolve_table(
    catalog: &dyn Catalog,
    method: Method,
    reference: &TableRef,
) -> Result<Option<Arc<Table>>> {
    let name = reference.name();
    match method {
        Method::ShowTables => Ok(None),
        Method::CreateTable { .. } => {
            if name.trim().is_empty() {
                return Err(Error::InvalidTableReference("empty table name".to_string()));
            }
            if catalog.table(name).is_some() {
                return Err(Error::InvalidTableReference(format!(
                    "table `{name}` already exists"
                )));
            }
            Ok(None)
        }
        _ => match reference {
            TableRef::Table(table)
                if table.is_joined()
                    && matches!(method, Method::Select | Method::Distinct | Method::Count) =>
            {
                Ok(Some(Arc::clone(table)))
            }
            _ => catalog
                .table(name)
                .map(Some)
                .ok_or_else(|| Error::InvalidTableReference(format!("unknown table: {name}"))),
        },
    }
}

/// Full validation: every structural check runs before any semantic one.
pub(crate) fn validate<D: Dialect + ?Sized>(
    dialect: &D,
    catalog: &dyn Catalog,
    request: &Request,
) -> Result<Resolved> {
    let resolved = resolve(catalog, request)?;
    check_structure(dialect, &resolved, request)?;
    check_semantics(dialect, catalog, &resolved, request)?;
    Ok(resolved)
}

fn check_structure<D: Dialect + ?Sized>(
    dialect: &D,
    resolved: &Resolved,
    request: &Request,
) -> Result<()> {
    let method = resolved.method;
    let fields = &request.fields;
    let modifiers = &request.modifiers;
    let wrong_shape = || {
        Error::StructuralField(format!(
            "{} does not accept {} as fields",
            method.keyword(),
            fields.shape()
        ))
    };

    match method {
        Method::Insert | Method::Update => match fields {
            Fields::Values(values) if values.is_empty() => {
                return Err(Error::StructuralField(format!(
                    "{} requires at least one value",
                    method.keyword()
                )));
            }
            Fields::Values(_) => {}
            _ => return Err(wrong_shape()),
        },
        Method::RenameTable => match fields {
            Fields::Column(ColumnRef::Name(name)) if !name.trim().is_empty() => {}
            _ => {
                return Err(Error::StructuralField(
                    "rename table expects the new table name".to_string(),
                ));
            }
        },
        Method::DropColumn => {
            if !matches!(fields, Fields::Column(_)) {
                return Err(wrong_shape());
            }
        }
        Method::CreateTable { .. } => match (&request.table, fields) {
            (TableRef::Table(table), Fields::None) => {
                if table.columns().is_empty() {
                    return Err(Error::StructuralField(format!(
                        "table `{}` has no columns",
                        table.name()
                    )));
                }
                for column in table.columns() {
                    check_dtype(dialect, column)?;
                }
            }
            (_, Fields::Column(_)) | (_, Fields::Columns(_)) => {
                let references = create_definitions(fields)?;
                if references.is_empty() {
                    return Err(Error::StructuralField(
                        "create table expects at least one column definition".to_string(),
                    ));
                }
                for reference in &references {
                    definition(dialect, reference)?;
                }
            }
            _ => {
                return Err(Error::StructuralField(
                    "create table expects a table or column definitions".to_string(),
                ));
            }
        },
        Method::AddColumn => match fields {
            Fields::Column(reference) => {
                definition(dialect, reference)?;
            }
            _ => return Err(wrong_shape()),
        },
        Method::AlterColumn => match fields {
            Fields::Column(_) => {
                let to = modifiers.to.as_ref().ok_or_else(|| {
                    Error::StructuralField("alter column requires a `to` definition".to_string())
                })?;
                definition(dialect, to)?;
            }
            Fields::Change(_, to) => {
                definition(dialect, to)?;
            }
            _ => return Err(wrong_shape()),
        },
        Method::Select | Method::Distinct => {
            if !matches!(
                fields,
                Fields::None | Fields::All | Fields::Column(_) | Fields::Columns(_)
            ) {
                return Err(wrong_shape());
            }
        }
        Method::Count => {
            if !matches!(fields, Fields::None | Fields::All | Fields::Column(_)) {
                return Err(wrong_shape());
            }
        }
        Method::AddConstraint(kind) => {
            if !matches!(fields, Fields::Column(_)) {
                return Err(wrong_shape());
            }
            if kind == ConstraintKind::Foreign {
                let foreign = modifiers.foreign.as_ref().ok_or_else(|| {
                    Error::StructuralField("add foreign requires a `foreign` column".to_string())
                })?;
                foreign.split_qualified()?;
            }
        }
        Method::DropConstraint => {
            if !matches!(fields, Fields::Constraint(_)) {
                return Err(Error::StructuralField(
                    "drop constraint expects a constraint, not a column reference".to_string(),
                ));
            }
        }
        Method::Delete
        | Method::DropTable { .. }
        | Method::ShowTables
        | Method::Describe
        | Method::Truncate => {}
    }

    if method.accepts_where() {
        if let Some(predicate) = &modifiers.where_clause {
            if !predicate.is_comparison() {
                return Err(Error::StructuralField(format!(
                    "where must be a comparison, got {}",
                    predicate.dtype().unwrap_or("an operand")
                )));
            }
        }
    }

    Ok(())
}

fn check_semantics<D: Dialect + ?Sized>(
    _dialect: &D,
    catalog: &dyn Catalog,
    resolved: &Resolved,
    request: &Request,
) -> Result<()> {
    let method = resolved.method;
    let fields = &request.fields;
    let modifiers = &request.modifiers;

    match method {
        Method::Insert => {
            let table = resolved.table()?;
            let Fields::Values(values) = fields else {
                return Err(Error::Internal("insert without values".to_string()));
            };
            let mut present = HashSet::new();
            for (reference, _) in values {
                present.insert(resolve_column(table, reference)?.name.as_str());
            }
            for column in table.columns() {
                let required = !column.nullable && column.default.is_none() && !column.auto_increment;
                if required && !present.contains(column.name.as_str()) {
                    return Err(Error::SemanticField(format!(
                        "missing required column {}",
                        column.qualified_name()
                    )));
                }
            }
        }
        Method::Update => {
            let table = resolved.table()?;
            if let Fields::Values(values) = fields {
                for (reference, _) in values {
                    resolve_column(table, reference)?;
                }
            }
        }
        Method::RenameTable => {
            let new_name = match fields {
                Fields::Column(reference) => reference.name(),
                _ => return Err(Error::Internal("rename without a name".to_string())),
            };
            if catalog.table(new_name).is_some() {
                return Err(Error::SemanticField(format!(
                    "table `{new_name}` already exists"
                )));
            }
        }
        Method::DropColumn => {
            if let Fields::Column(reference) = fields {
                resolve_column(resolved.table()?, reference)?;
            }
        }
        Method::CreateTable { .. } => {
            let columns = planned_columns(request)?;
            let mut seen = HashSet::new();
            for column in &columns {
                if !seen.insert(column.name.as_str()) {
                    return Err(Error::SemanticField(format!(
                        "duplicate column name: {}",
                        column.name
                    )));
                }
            }
        }
        Method::AddColumn => {
            let table = resolved.table()?;
            if let Fields::Column(reference) = fields {
                let column = reference.to_column()?;
                if table.column(&column.name).is_some() {
                    return Err(Error::SemanticField(format!(
                        "column {}.{} already exists",
                        table.name(),
                        column.name
                    )));
                }
            }
            if let Some(after) = &modifiers.after {
                if !is_first(after) {
                    resolve_column(table, after)?;
                }
            }
        }
        Method::AlterColumn => {
            let table = resolved.table()?;
            let (old, to) = match fields {
                Fields::Change(old, to) => (old, Some(to)),
                Fields::Column(old) => (old, modifiers.to.as_ref()),
                _ => return Err(Error::Internal("alter column without a column".to_string())),
            };
            let old = resolve_column(table, old)?;
            if let Some(to) = to {
                let renamed = to.to_column()?;
                if renamed.name != old.name && table.column(&renamed.name).is_some() {
                    return Err(Error::SemanticField(format!(
                        "column {}.{} already exists",
                        table.name(),
                        renamed.name
                    )));
                }
            }
        }
        Method::Select | Method::Distinct | Method::Count => {
            let table = resolved.table()?;
            match fields {
                Fields::Column(reference) if !is_all(reference) => {
                    resolve_column(table, reference)?;
                }
                Fields::Columns(references) => {
                    for reference in references {
                        resolve_column(table, reference)?;
                    }
                }
                _ => {}
            }
        }
        Method::AddConstraint(kind) => {
            let table = resolved.table()?;
            let Fields::Column(reference) = fields else {
                return Err(Error::Internal("add constraint without a column".to_string()));
            };
            let target = resolve_column(table, reference)?;
            match kind {
                ConstraintKind::Primary if target.nullable => {
                    return Err(Error::ConstraintViolation(format!(
                        "primary key may only be created if {} is NOT NULL",
                        target.qualified_name()
                    )));
                }
                ConstraintKind::Foreign => {
                    let foreign = modifiers.foreign.as_ref().ok_or_else(|| {
                        Error::Internal("add foreign without a foreign column".to_string())
                    })?;
                    let (foreign_table, foreign_column) = foreign.split_qualified()?;
                    if foreign_table == table.name() {
                        return Err(Error::ConstraintViolation(format!(
                            "cannot foreign key a table on itself: {}",
                            table.name()
                        )));
                    }
                    let other = catalog.table(&foreign_table).ok_or_else(|| {
                        Error::SemanticField(format!("unknown foreign table: {foreign_table}"))
                    })?;
                    let foreign = other.column(&foreign_column).ok_or_else(|| {
                        Error::SemanticField(format!(
                            "unknown foreign column: {foreign_table}.{foreign_column}"
                        ))
                    })?;
                    if modifiers.name.is_none() {
                        check_name_len(&ForeignKey::default_name(&target.key(), &foreign.key()))?;
                    }
                }
                _ => {}
            }
            if let Some(name) = &modifiers.name {
                check_name_len(name)?;
            }
        }
        Method::DropConstraint => {
            let table = resolved.table()?;
            if let Fields::Constraint(constraint) = fields {
                if !table.constraints().contains(&constraint) {
                    return Err(Error::SemanticField(format!(
                        "constraint `{}` is not attached to {}",
                        constraint.name(),
                        table.name()
                    )));
                }
            }
        }
        Method::Delete
        | Method::DropTable { .. }
        | Method::ShowTables
        | Method::Describe
        | Method::Truncate => {}
    }

    if method.accepts_limit() {
        if let Some(limit) = modifiers.limit {
            if limit <= 0 {
                return Err(Error::SemanticField(format!(
                    "limit must be a positive integer, got {limit}"
                )));
            }
        }
    }
    if method.accepts_group_by() {
        if let Some(column) = &modifiers.group_by {
            resolve_column(resolved.table()?, column)?;
        }
    }
    if method.accepts_order_by() {
        if let Some(column) = &modifiers.order_by {
            resolve_column(resolved.table()?, column)?;
        }
    }

    Ok(())
}

/// Resolve a reference against `table`; a miss is a semantic error.
pub(crate) fn resolve_column<'t>(table: &'t Table, reference: &ColumnRef) -> Result<&'t Column> {
    table.get_column(reference).ok_or_else(|| {
        Error::SemanticField(format!(
            "unknown column {} in {}",
            reference.name(),
            table.name()
        ))
    })
}

/// Columns a create table request would produce.
pub(crate) fn planned_columns(request: &Request) -> Result<Vec<Column>> {
    match (&request.table, &request.fields) {
        (TableRef::Table(table), Fields::None) => Ok(table.columns().to_vec()),
        (_, Fields::Column(_)) | (_, Fields::Columns(_)) => create_definitions(&request.fields)?
            .iter()
            .map(ColumnRef::to_column)
            .collect(),
        _ => Err(Error::Internal("create table without columns".to_string())),
    }
}

/// Create table payload as one reference per definition, splitting
/// comma-separated definition strings.
pub(crate) fn create_definitions(fields: &Fields) -> Result<Vec<ColumnRef>> {
    let references = match fields {
        Fields::Column(reference) => std::slice::from_ref(reference),
        Fields::Columns(references) => references.as_slice(),
        _ => return Err(Error::Internal("create table without columns".to_string())),
    };
    let mut split = Vec::with_capacity(references.len());
    for reference in references {
        split.extend(reference.split_definitions()?);
    }
    Ok(split)
}

pub(crate) fn is_all(reference: &ColumnRef) -> bool {
    matches!(reference, ColumnRef::Name(name) if name.eq_ignore_ascii_case("all") || name == "*")
}

pub(crate) fn is_first(reference: &ColumnRef) -> bool {
    matches!(reference, ColumnRef::Name(name) if name.eq_ignore_ascii_case("first"))
}

fn definition<D: Dialect + ?Sized>(dialect: &D, reference: &ColumnRef) -> Result<Column> {
    let column = reference.to_column()?;
    check_dtype(dialect, &column)?;
    Ok(column)
}

fn check_dtype<D: Dialect + ?Sized>(dialect: &D, column: &Column) -> Result<()> {
    if !dialect.is_valid_dtype(&column.dtype) {
        return Err(Error::StructuralField(format!(
            "unknown {} column type `{}` for {}",
            dialect.name(),
            column.dtype,
            column.name
        )));
    }
    Ok(())
}

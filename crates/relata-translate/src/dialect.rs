use relata_core::{ColumnKey, Constraint, Named, Result, Row, Value};

use crate::method::ConstraintKind;

/// Everything needed to render one `alter table ... add` constraint clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintClause<'a> {
    pub kind: ConstraintKind,
    /// Explicit constraint name; the engine picks one when absent.
    pub name: Option<&'a str>,
    /// Column identifier, already quoted when needed.
    pub column: &'a str,
    /// Referenced `(table, column)` for foreign keys.
    pub references: Option<(&'a str, &'a str)>,
}

/// Escaping, type-naming and clause-rendering rules for one engine.
pub trait Dialect {
    /// Engine identifier (e.g. `mysql`).
    fn name(&self) -> &'static str;

    /// Quote a table or column identifier.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Column identifier, quoted only when it is not a bare word.
    fn column_identifier(&self, name: &str) -> String {
        if is_bare_identifier(name) {
            name.to_string()
        } else {
            self.quote_identifier(name)
        }
    }

    /// `table.column` with each part passed through [`Dialect::column_identifier`].
    ///
    /// Joined column names already carry their prefix and are split on the first `.`.
    fn qualified_column(&self, key: &ColumnKey) -> String {
        let (table, column) = match (&key.table, key.column.split_once('.')) {
            (_, Some((prefix, column))) => (Some(prefix), column),
            (Some(table), None) => (Some(table.as_str()), key.column.as_str()),
            (None, None) => (None, key.column.as_str()),
        };
        match table {
            Some(table) => format!(
                "{}.{}",
                self.column_identifier(table),
                self.column_identifier(column)
            ),
            None => self.column_identifier(column),
        }
    }

    /// Escape a string for use inside a quoted literal.
    fn escape_string(&self, raw: &str) -> String;

    /// Column types accepted in definitions, lowercase, without parameters.
    fn dtypes(&self) -> &'static [&'static str];

    /// Turn one `describe` row back into a column definition.
    fn describe_definition(&self, row: &Row) -> Result<String>;

    /// Render a value as a literal.
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(value) => if *value { "1" } else { "0" }.to_string(),
            Value::Int(value) => value.to_string(),
            Value::UInt(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Text(text) => format!("'{}'", self.escape_string(text)),
            Value::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Whether the base type of `dtype` (`varchar(255) binary` → `varchar`) is known.
    fn is_valid_dtype(&self, dtype: &str) -> bool {
        let base = dtype
            .split(|ch: char| ch == '(' || ch.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.dtypes().contains(&base.as_str())
    }

    /// Text after `alter table <t> ` that adds a constraint.
    fn add_constraint_clause(&self, clause: &ConstraintClause<'_>) -> String {
        let ConstraintClause {
            kind,
            name,
            column,
            references,
        } = clause;
        let named = name.map(|name| format!("{name} ")).unwrap_or_default();
        match (kind, references) {
            (ConstraintKind::Index, _) => format!("add index {named}({column})"),
            (ConstraintKind::Unique, _) => format!("add {}unique ({column})", constraint_prefix(*name)),
            (ConstraintKind::Primary, _) => {
                format!("add {}primary key ({column})", constraint_prefix(*name))
            }
            (ConstraintKind::Foreign, Some((table, foreign))) => format!(
                "add {}foreign key ({column}) references {} ({})",
                constraint_prefix(*name),
                self.quote_identifier(table),
                self.column_identifier(foreign)
            ),
            (ConstraintKind::Foreign, None) => {
                format!("add {}foreign key ({column})", constraint_prefix(*name))
            }
        }
    }

    /// Text after `alter table <t> ` that drops a constraint.
    fn drop_constraint_clause(&self, constraint: &Constraint) -> String {
        match constraint {
            Constraint::Index(_) | Constraint::Unique(_) => {
                format!("drop index {}", constraint.name())
            }
            Constraint::PrimaryKey(_) => "drop primary key".to_string(),
            Constraint::ForeignKey(_) => format!("drop foreign key {}", constraint.name()),
        }
    }

    /// Table name from one `show tables` row.
    fn table_name(&self, row: &Row) -> Result<String> {
        row.first().map(ToString::to_string).ok_or_else(|| {
            relata_core::Error::Internal("empty row in table listing".to_string())
        })
    }
}

/// Identifier that needs no quoting: word characters only, not all digits.
pub fn is_bare_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
        && !name.chars().all(|ch| ch.is_ascii_digit())
}

fn constraint_prefix(name: Option<&str>) -> String {
    name.map(|name| format!("constraint {name} "))
        .unwrap_or_default()
}

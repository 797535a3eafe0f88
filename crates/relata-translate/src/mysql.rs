use relata_core::{Column, Error, KeyKind, Result, Row, Value};

use crate::dialect::Dialect;

const MYSQL_TYPES: &[&str] = &[
    "bit",
    "tinyint",
    "bool",
    "boolean",
    "smallint",
    "mediumint",
    "int",
    "integer",
    "bigint",
    "serial",
    "decimal",
    "float",
    "double",
    "date",
    "datetime",
    "timestamp",
    "time",
    "year",
    "char",
    "varchar",
    "binary",
    "varbinary",
    "tinyblob",
    "tinytext",
    "blob",
    "text",
    "mediumblob",
    "mediumtext",
    "longblob",
    "longtext",
    "enum",
    "set",
    "json",
];

const QUOTED_DEFAULT_TYPES: &[&str] = &[
    "char", "varchar", "tinytext", "text", "mediumtext", "longtext", "enum", "set", "date",
    "datetime", "timestamp", "time",
];

/// MySQL / MariaDB rules: backtick identifiers, backslash escapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn escape_string(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for ch in raw.chars() {
            match ch {
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\0' => out.push_str("\\0"),
                '\u{1a}' => out.push_str("\\Z"),
                other => out.push(other),
            }
        }
        out
    }

    fn dtypes(&self) -> &'static [&'static str] {
        MYSQL_TYPES
    }

    /// `Field`, `Type`, `Null`, `Key`, `Default`, `Extra` → definition.
    fn describe_definition(&self, row: &Row) -> Result<String> {
        let text = |field: &str| -> Option<String> {
            row.get(field)
                .or_else(|| row.get(&field.to_ascii_lowercase()))
                .filter(|value| !value.is_null())
                .map(ToString::to_string)
        };

        let name = text("Field")
            .ok_or_else(|| Error::Internal("describe row without `Field`".to_string()))?;
        let dtype = text("Type")
            .ok_or_else(|| Error::Internal(format!("describe row for `{name}` without `Type`")))?;
        let extra = text("Extra").unwrap_or_default().to_ascii_lowercase();

        let mut column = Column::new(name, dtype.clone())
            .with_nullable(text("Null").is_some_and(|null| null.eq_ignore_ascii_case("yes")))
            .with_auto_increment(extra.contains("auto_increment"))
            .with_visible(!extra.contains("invisible"));

        if let Some(default) = text("Default") {
            column = column.with_default(default_literal(&dtype, &default, &extra));
        }

        column = match text("Key").as_deref() {
            Some("PRI") => column.with_key(KeyKind::Primary),
            Some("UNI") => column.with_key(KeyKind::Unique),
            Some("MUL") => column.with_key(KeyKind::Index),
            _ => column,
        };

        Ok(column.to_definition())
    }
}

/// `describe` reports defaults unquoted; quote string-typed ones unless they are expressions.
fn default_literal(dtype: &str, default: &str, extra: &str) -> String {
    let base = dtype
        .split(|ch: char| ch == '(' || ch.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_expression = extra.contains("default_generated")
        || default.eq_ignore_ascii_case("current_timestamp")
        || default.starts_with('(');
    if QUOTED_DEFAULT_TYPES.contains(&base.as_str()) && !is_expression {
        format!("'{}'", MySql.escape_string(default))
    } else {
        default.to_string()
    }
}

/// Parse a text-protocol cell into the [`Value`] matching its MySQL column type.
pub fn value_from_text(type_name: &str, text: &str) -> Value {
    let upper = type_name.to_ascii_uppercase();
    let unsigned = upper.contains("UNSIGNED");
    let base = upper.split_whitespace().next().unwrap_or_default();
    match base {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            let parsed = if unsigned {
                text.parse::<u64>().ok().map(Value::UInt)
            } else {
                text.parse::<i64>().ok().map(Value::Int)
            };
            parsed.unwrap_or_else(|| Value::Text(text.to_string()))
        }
        "BOOLEAN" | "BOOL" => match text {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            _ => Value::Text(text.to_string()),
        },
        "FLOAT" | "DOUBLE" => text
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Text(text.to_string())),
        _ => Value::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relata_core::ColumnKey;

    #[test]
    fn quotes_identifiers_with_backticks() {
        assert_eq!(MySql.quote_identifier("order"), "`order`");
        assert_eq!(MySql.quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn column_identifiers_are_quoted_only_when_needed() {
        assert_eq!(MySql.column_identifier("user_id"), "user_id");
        assert_eq!(MySql.column_identifier("user id"), "`user id`");
        assert_eq!(MySql.column_identifier("42"), "`42`");
        assert_eq!(
            MySql.qualified_column(&ColumnKey::new(Some("orders"), "user id")),
            "orders.`user id`"
        );
        assert_eq!(
            MySql.qualified_column(&ColumnKey::new(None, "my table.id")),
            "`my table`.id"
        );
        assert_eq!(MySql.qualified_column(&ColumnKey::new(None, "total")), "total");
    }

    #[test]
    fn escapes_string_literals() {
        assert_eq!(MySql.literal(&Value::from("it's\n")), "'it\\'s\\n'");
        assert_eq!(MySql.literal(&Value::Null), "NULL");
        assert_eq!(MySql.literal(&Value::Bytes(vec![0xde, 0xad])), "X'dead'");
    }

    #[test]
    fn validates_base_types() {
        assert!(MySql.is_valid_dtype("varchar(255)"));
        assert!(MySql.is_valid_dtype("INT unsigned"));
        assert!(!MySql.is_valid_dtype("uuid"));
    }

    #[test]
    fn describe_rows_become_definitions() {
        let row = Row::from_pairs([
            ("Field", Value::from("id")),
            ("Type", Value::from("int unsigned")),
            ("Null", Value::from("NO")),
            ("Key", Value::from("PRI")),
            ("Default", Value::Null),
            ("Extra", Value::from("auto_increment")),
        ]);
        assert_eq!(
            MySql.describe_definition(&row).expect("definition"),
            "id int unsigned not null auto_increment primary key"
        );

        let row = Row::from_pairs([
            ("Field", Value::from("status")),
            ("Type", Value::from("varchar(16)")),
            ("Null", Value::from("YES")),
            ("Key", Value::from("")),
            ("Default", Value::from("new")),
            ("Extra", Value::from("")),
        ]);
        assert_eq!(
            MySql.describe_definition(&row).expect("definition"),
            "status varchar(16) null default 'new'"
        );
    }

    #[test]
    fn text_values_follow_column_type() {
        assert_eq!(value_from_text("BIGINT", "-4"), Value::Int(-4));
        assert_eq!(value_from_text("INT UNSIGNED", "4"), Value::UInt(4));
        assert_eq!(value_from_text("DOUBLE", "1.5"), Value::Float(1.5));
        assert_eq!(value_from_text("DECIMAL", "1.50"), Value::from("1.50"));
    }
}

use relata_core::{Error, KeyKind, Result};

/// Constraint category named by an `add ...` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Index,
    Unique,
    Primary,
    Foreign,
}

impl ConstraintKind {
    pub fn key_kind(self) -> Option<KeyKind> {
        match self {
            ConstraintKind::Index => Some(KeyKind::Index),
            ConstraintKind::Unique => Some(KeyKind::Unique),
            ConstraintKind::Primary => Some(KeyKind::Primary),
            ConstraintKind::Foreign => None,
        }
    }
}

/// Operation parsed from a compound method keyword string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Select,
    Distinct,
    Count,
    Insert,
    Update,
    Delete,
    ShowTables,
    Describe,
    /// `if_not_exists` keeps the guard even when the request clobbers.
    CreateTable { temporary: bool, if_not_exists: bool },
    DropTable { temporary: bool },
    RenameTable,
    Truncate,
    AddColumn,
    DropColumn,
    AlterColumn,
    AddConstraint(ConstraintKind),
    DropConstraint,
}

impl Method {
    /// Parse case-insensitively by keyword membership.
    ///
    /// `"create temporary table if not exists"`, `"add primary key"` and
    /// `"select distinct"` are all accepted. A method naming two constraint
    /// categories (`"add foreign index"`) is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let lowered = raw.to_ascii_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let has = |word: &str| words.contains(&word);
        let adds = has("add") || has("create");

        let method = if has("show") && has("tables") {
            Method::ShowTables
        } else if has("describe") {
            Method::Describe
        } else if has("truncate") {
            Method::Truncate
        } else if has("rename") || (has("move") && has("table")) {
            Method::RenameTable
        } else if has("constraint") && has("drop") {
            Method::DropConstraint
        } else if has("column") {
            if adds {
                Method::AddColumn
            } else if has("drop") {
                Method::DropColumn
            } else if has("alter") || has("change") || has("modify") {
                Method::AlterColumn
            } else {
                return Err(Error::InvalidMethod(raw.to_string()));
            }
        } else if has("table") && adds {
            Method::CreateTable {
                temporary: has("temporary"),
                if_not_exists: has("if") && has("exists"),
            }
        } else if has("table") && has("drop") {
            Method::DropTable {
                temporary: has("temporary"),
            }
        } else if adds {
            let kinds: Vec<ConstraintKind> = [
                ("index", ConstraintKind::Index),
                ("unique", ConstraintKind::Unique),
                ("primary", ConstraintKind::Primary),
                ("foreign", ConstraintKind::Foreign),
            ]
            .into_iter()
            .filter(|(word, _)| has(word))
            .map(|(_, kind)| kind)
            .collect();
            match kinds.as_slice() {
                [kind] => Method::AddConstraint(*kind),
                [] => return Err(Error::InvalidMethod(raw.to_string())),
                _ => {
                    return Err(Error::InvalidMethod(format!(
                        "{raw}: must not contain multiple constraints"
                    )));
                }
            }
        } else if has("distinct") {
            Method::Distinct
        } else if has("count") {
            Method::Count
        } else if has("select") {
            Method::Select
        } else if has("insert") {
            Method::Insert
        } else if has("update") {
            Method::Update
        } else if has("delete") {
            Method::Delete
        } else {
            return Err(Error::InvalidMethod(raw.to_string()));
        };
        Ok(method)
    }

    /// Short stable name, used in logs.
    pub fn keyword(self) -> &'static str {
        match self {
            Method::Select => "select",
            Method::Distinct => "distinct",
            Method::Count => "count",
            Method::Insert => "insert",
            Method::Update => "update",
            Method::Delete => "delete",
            Method::ShowTables => "show tables",
            Method::Describe => "describe",
            Method::CreateTable { .. } => "create table",
            Method::DropTable { .. } => "drop table",
            Method::RenameTable => "rename table",
            Method::Truncate => "truncate",
            Method::AddColumn => "add column",
            Method::DropColumn => "drop column",
            Method::AlterColumn => "alter column",
            Method::AddConstraint(ConstraintKind::Index) => "add index",
            Method::AddConstraint(ConstraintKind::Unique) => "add unique",
            Method::AddConstraint(ConstraintKind::Primary) => "add primary",
            Method::AddConstraint(ConstraintKind::Foreign) => "add foreign",
            Method::DropConstraint => "drop constraint",
        }
    }

    /// Methods after which the affected table must be described again.
    pub fn is_schema_change(self) -> bool {
        matches!(
            self,
            Method::CreateTable { .. }
                | Method::DropTable { .. }
                | Method::RenameTable
                | Method::AddColumn
                | Method::DropColumn
                | Method::AlterColumn
                | Method::AddConstraint(_)
                | Method::DropConstraint
        )
    }

    /// Methods whose response carries rows.
    pub fn returns_rows(self) -> bool {
        matches!(
            self,
            Method::Select | Method::Distinct | Method::Count | Method::ShowTables | Method::Describe
        )
    }

    /// Whether the method needs an existing table (everything but create and show tables).
    pub fn needs_existing_table(self) -> bool {
        !matches!(self, Method::CreateTable { .. } | Method::ShowTables)
    }

    pub fn accepts_where(self) -> bool {
        matches!(
            self,
            Method::Select | Method::Distinct | Method::Count | Method::Update | Method::Delete
        )
    }

    pub fn accepts_group_by(self) -> bool {
        matches!(self, Method::Select | Method::Distinct | Method::Count)
    }

    pub fn accepts_order_by(self) -> bool {
        matches!(self, Method::Select | Method::Distinct)
    }

    pub fn accepts_limit(self) -> bool {
        matches!(self, Method::Select | Method::Distinct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_keywords() {
        assert_eq!(
            Method::parse("Create Temporary Table If Not Exists").expect("method"),
            Method::CreateTable {
                temporary: true,
                if_not_exists: true
            }
        );
        assert_eq!(
            Method::parse("create table").expect("method"),
            Method::CreateTable {
                temporary: false,
                if_not_exists: false
            }
        );
        assert_eq!(
            Method::parse("drop temporary table").expect("method"),
            Method::DropTable { temporary: true }
        );
        assert_eq!(Method::parse("select distinct").expect("method"), Method::Distinct);
        assert_eq!(Method::parse("show tables").expect("method"), Method::ShowTables);
        assert_eq!(
            Method::parse("add primary key").expect("method"),
            Method::AddConstraint(ConstraintKind::Primary)
        );
        assert_eq!(Method::parse("create column").expect("method"), Method::AddColumn);
        assert_eq!(Method::parse("alter column").expect("method"), Method::AlterColumn);
        assert_eq!(Method::parse("drop constraint").expect("method"), Method::DropConstraint);
        assert_eq!(Method::parse("truncate table").expect("method"), Method::Truncate);
    }

    #[test]
    fn rejects_multiple_constraint_categories() {
        let err = Method::parse("add foreign index").expect_err("two categories");
        assert!(matches!(err, Error::InvalidMethod(message) if message.contains("multiple")));
    }

    #[test]
    fn rejects_unknown_methods() {
        assert!(matches!(Method::parse("merge"), Err(Error::InvalidMethod(_))));
        assert!(matches!(Method::parse("add"), Err(Error::InvalidMethod(_))));
        assert!(matches!(Method::parse(""), Err(Error::InvalidMethod(_))));
    }
}

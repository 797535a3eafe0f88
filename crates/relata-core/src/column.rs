use std::fmt;

use crate::constraints::{ColumnKey, Constraint, ForeignKey, Index, KeyKind, Lookup, PrimaryKey, Unique};
use crate::definition;
use crate::error::{Error, Result};
use crate::Named;

/// One field of a table.
///
/// The owning table is held by name; [`crate::Table::new`] rewrites it.
/// At most one keyed constraint (index, unique or primary) is attached at a
/// time: attaching a stronger one replaces the weaker.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    table: Option<String>,
    pub name: String,
    pub dtype: String,
    pub nullable: bool,
    /// Raw default expression, as written in a definition.
    pub default: Option<String>,
    pub visible: bool,
    pub auto_increment: bool,
    pub comment: String,
    constraints: Vec<Constraint>,
}

impl Column {
    /// Nullable, visible column without default, increment or constraints.
    pub fn new(name: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
            dtype: dtype.into(),
            nullable: true,
            default: None,
            visible: true,
            auto_increment: false,
            comment: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Parse a column definition such as `` `user id` int not null primary key ``.
    pub fn from_definition(definition: &str) -> Result<Self> {
        definition::parse(definition)
    }

    /// Serialize back to the definition grammar.
    pub fn to_definition(&self) -> String {
        definition::render(self)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Attach a keyed constraint with its default name. Primary forces NOT NULL.
    pub fn with_key(mut self, kind: KeyKind) -> Self {
        if kind == KeyKind::Primary {
            self.nullable = false;
        }
        let key = self.key();
        let constraint = match kind {
            KeyKind::Index => Constraint::Index(Index::new(key, None)),
            KeyKind::Unique => Constraint::Unique(Unique::new(key, None)),
            KeyKind::Primary => Constraint::PrimaryKey(PrimaryKey::not_null(key, None)),
        };
        self.attach(constraint);
        self
    }

    /// Name of the owning table, if any.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn key(&self) -> ColumnKey {
        ColumnKey::new(self.table.as_deref(), self.name.clone())
    }

    /// `table.name`, or the name itself when unowned or already qualified.
    pub fn qualified_name(&self) -> String {
        self.key().qualified()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Strongest keyed category attached, if any.
    pub fn key_kind(&self) -> Option<KeyKind> {
        self.constraints.iter().filter_map(Constraint::category).max()
    }

    pub(crate) fn set_owner(&mut self, table: &str) {
        let old = self.key();
        self.table = Some(table.to_string());
        let new = self.key();
        for constraint in &mut self.constraints {
            constraint.retarget(&old, &new);
        }
    }

    /// Push a constraint, keeping one keyed constraint per column.
    ///
    /// A stronger category replaces the attached one; an equal or weaker
    /// one is discarded and the attached constraint stays.
    fn attach(&mut self, constraint: Constraint) -> usize {
        let Some(kind) = constraint.category() else {
            self.constraints.push(constraint);
            return self.constraints.len() - 1;
        };

        let existing = self
            .constraints
            .iter()
            .position(|c| c.category().is_some());
        match existing {
            Some(index) if self.constraints[index].category() >= Some(kind) => index,
            Some(index) => {
                self.constraints[index] = constraint;
                index
            }
            None => {
                self.constraints.push(constraint);
                self.constraints.len() - 1
            }
        }
    }

    /// Attach an existing constraint, with the same collapsing as the `add_*` methods.
    pub fn attach_constraint(&mut self, constraint: Constraint) -> &Constraint {
        let index = self.attach(constraint);
        &self.constraints[index]
    }

    /// Attach an index.
    pub fn add_index(&mut self, name: Option<&str>) -> &Constraint {
        let index = self.attach(Constraint::Index(Index::new(self.key(), name)));
        &self.constraints[index]
    }

    /// Attach a unique constraint.
    pub fn add_unique(&mut self, name: Option<&str>) -> &Constraint {
        let index = self.attach(Constraint::Unique(Unique::new(self.key(), name)));
        &self.constraints[index]
    }

    /// Attach a primary key. Fails on a nullable column.
    pub fn add_primary_key(&mut self, name: Option<&str>) -> Result<&Constraint> {
        let primary = PrimaryKey::new(self.key(), self.nullable, name)?;
        let index = self.attach(Constraint::PrimaryKey(primary));
        Ok(&self.constraints[index])
    }

    /// Reference `foreign` from this column.
    ///
    /// Fails when both columns share a table. The foreign column gets an
    /// index if it has none, and the key is recorded on both columns.
    pub fn add_foreign_key(&mut self, foreign: &mut Column, name: Option<&str>) -> Result<&Constraint> {
        let fk = ForeignKey::new(self.key(), foreign.key(), name)?;
        if foreign.find_constraint(KeyKind::Index.as_str()).is_none() {
            foreign.add_index(None);
        }
        foreign.constraints.push(Constraint::ForeignKey(fk.clone()));
        let index = self.attach(Constraint::ForeignKey(fk));
        Ok(&self.constraints[index])
    }

    /// Highest-priority match for a category, or first match for a name.
    pub fn find_constraint(&self, lookup: &str) -> Option<&Constraint> {
        self.matching(&Lookup::parse(lookup))
            .map(|index| &self.constraints[index])
    }

    /// Like [`Column::find_constraint`], but also drops every other match.
    ///
    /// Calling it twice with the same lookup returns the same constraint.
    pub fn get_constraint(&mut self, lookup: &str) -> Option<&Constraint> {
        let lookup = Lookup::parse(lookup);
        let keep = self.matching(&lookup)?;

        let mut kept = keep;
        let mut position = 0;
        self.constraints.retain(|constraint| {
            let current = position;
            position += 1;
            if current == keep || !constraint.matches(&lookup) {
                return true;
            }
            if current < keep {
                kept -= 1;
            }
            false
        });
        self.constraints.get(kept)
    }

    /// Detach and return the constraint with this name.
    pub fn drop_constraint(&mut self, name: &str) -> Option<Constraint> {
        let index = self.constraints.iter().position(|c| c.name() == name)?;
        Some(self.constraints.remove(index))
    }

    fn matching(&self, lookup: &Lookup<'_>) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (index, constraint) in self.constraints.iter().enumerate() {
            if !constraint.matches(lookup) {
                continue;
            }
            match (lookup, best) {
                (_, None) => best = Some(index),
                (Lookup::Category(_), Some(current))
                    if constraint.category() > self.constraints[current].category() =>
                {
                    best = Some(index)
                }
                _ => {}
            }
        }
        best
    }
}

impl Named for Column {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_definition())
    }
}

/// A column given by name (or, for DDL methods, by definition) or by value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    Name(String),
    Column(Column),
}

impl ColumnRef {
    /// Column name without any table prefix resolution.
    pub fn name(&self) -> &str {
        match self {
            ColumnRef::Name(name) => name,
            ColumnRef::Column(column) => &column.name,
        }
    }

    /// Interpret as a column definition: parse strings, clone values.
    pub fn to_column(&self) -> Result<Column> {
        match self {
            ColumnRef::Name(definition) => Column::from_definition(definition),
            ColumnRef::Column(column) => Ok(column.clone()),
        }
    }

    /// Definition text: strings pass through, values are serialized.
    pub fn to_definition(&self) -> Result<String> {
        match self {
            ColumnRef::Name(definition) => {
                Column::from_definition(definition)?;
                Ok(definition.trim().to_string())
            }
            ColumnRef::Column(column) => Ok(column.to_definition()),
        }
    }

    /// One reference per column definition: a comma-separated string
    /// (`"a int, b text"`) splits outside quotes and brackets.
    pub fn split_definitions(&self) -> Result<Vec<ColumnRef>> {
        match self {
            ColumnRef::Name(text) => {
                let pieces = definition::split_definitions(text)?;
                if pieces.is_empty() {
                    return Err(Error::InvalidDefinition(format!(
                        "no column definitions in `{text}`"
                    )));
                }
                Ok(pieces.into_iter().map(ColumnRef::Name).collect())
            }
            ColumnRef::Column(_) => Ok(vec![self.clone()]),
        }
    }

    /// Fail unless this names a column with a table prefix.
    pub fn split_qualified(&self) -> Result<(String, String)> {
        match self {
            ColumnRef::Column(column) => match column.table() {
                Some(table) => Ok((table.to_string(), column.name.clone())),
                None => Err(Error::StructuralField(format!(
                    "column {} has no owning table",
                    column.name
                ))),
            },
            ColumnRef::Name(name) => match name.split_once('.') {
                Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                    Ok((table.to_string(), column.to_string()))
                }
                _ => Err(Error::StructuralField(format!(
                    "expected a table-qualified column, got `{name}`"
                ))),
            },
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        ColumnRef::Name(value.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::Name(value)
    }
}

impl From<Column> for ColumnRef {
    fn from(value: Column) -> Self {
        ColumnRef::Column(value)
    }
}

impl From<&Column> for ColumnRef {
    fn from(value: &Column) -> Self {
        ColumnRef::Column(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(name: &str, table: &str) -> Column {
        let mut column = Column::new(name, "int").with_nullable(false);
        column.set_owner(table);
        column
    }

    #[test]
    fn stronger_key_replaces_weaker() {
        let mut column = owned("id", "users");
        column.add_index(None);
        column.add_unique(Some("uq_id"));
        assert_eq!(column.constraints().len(), 1);
        assert_eq!(column.key_kind(), Some(KeyKind::Unique));

        column.add_index(Some("ignored"));
        assert_eq!(column.constraints().len(), 1);
        assert_eq!(column.constraints()[0].name(), "uq_id");
    }

    #[test]
    fn primary_key_flag_forces_not_null() {
        let column = Column::new("id", "int").with_key(KeyKind::Primary);
        assert!(!column.nullable);
        assert!(matches!(column.find_constraint("primary"), Some(Constraint::PrimaryKey(_))));
    }

    #[test]
    fn primary_key_on_nullable_column_fails() {
        let mut column = Column::new("note", "text");
        let err = column.add_primary_key(None).expect_err("nullable primary key");
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(column.constraints().is_empty());
    }

    #[test]
    fn get_constraint_is_idempotent() {
        let mut column = owned("id", "users");
        column.add_primary_key(None).expect("primary key");

        let first = column.get_constraint("index").cloned();
        let second = column.get_constraint("index").cloned();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(column.constraints().len(), 1);
        assert!(column.get_constraint("missing").is_none());
    }

    #[test]
    fn get_constraint_by_name_keeps_first_match() {
        let mut orders = owned("user_id", "orders");
        let mut users = owned("id", "users");
        orders.add_foreign_key(&mut users, Some("fk")).expect("fk");
        orders.add_index(Some("fk"));

        let kept = orders.get_constraint("fk").cloned().expect("constraint");
        assert!(matches!(kept, Constraint::ForeignKey(_)));
        assert_eq!(orders.constraints().len(), 1);
    }

    #[test]
    fn foreign_key_on_same_table_fails() {
        let mut left = owned("a", "t");
        let mut right = owned("b", "t");
        let err = left.add_foreign_key(&mut right, None).expect_err("self reference");
        assert!(matches!(err, Error::ConstraintViolation(_)));
    }

    #[test]
    fn foreign_key_indexes_foreign_column_once() {
        let mut orders = owned("user_id", "orders");
        let mut users = owned("id", "users");
        let name = orders
            .add_foreign_key(&mut users, None)
            .expect("fk")
            .name()
            .to_string();
        assert_eq!(name, "fk_orders_user_id_id");
        assert!(matches!(users.find_constraint("index"), Some(Constraint::Index(_))));

        let mut unique_users = owned("id", "users");
        unique_users.add_unique(None);
        let mut more_orders = owned("user_id", "orders");
        more_orders.add_foreign_key(&mut unique_users, None).expect("fk");
        assert!(matches!(unique_users.find_constraint("index"), Some(Constraint::Unique(_))));
        assert_eq!(unique_users.constraints().len(), 2);
    }

    #[test]
    fn definition_lists_split_into_references() {
        let list = ColumnRef::from("a int, b decimal(10, 2)");
        let parts = list.split_definitions().expect("split");
        assert_eq!(parts, vec![ColumnRef::from("a int"), ColumnRef::from("b decimal(10, 2)")]);

        let single = ColumnRef::from(Column::new("c", "text"));
        assert_eq!(single.split_definitions().expect("split"), vec![single.clone()]);
        assert!(matches!(
            ColumnRef::from(" , ").split_definitions(),
            Err(Error::InvalidDefinition(_))
        ));
    }

    #[test]
    fn drop_constraint_detaches_by_name() {
        let mut column = owned("id", "users");
        column.add_unique(Some("uq"));
        assert!(column.drop_constraint("uq").is_some());
        assert!(column.drop_constraint("uq").is_none());
        assert!(column.constraints().is_empty());
    }
}

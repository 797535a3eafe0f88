use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::table::Table;
use crate::value::{Row, Value};
use crate::Named;

/// Weak reference to a column: owning table name plus column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnKey {
    pub fn new(table: Option<&str>, column: impl Into<String>) -> Self {
        Self {
            table: table.map(str::to_string),
            column: column.into(),
        }
    }

    /// `table.column`, or the bare column when unowned or already qualified.
    pub fn qualified(&self) -> String {
        match &self.table {
            Some(table) if !self.column.contains('.') => format!("{table}.{}", self.column),
            _ => self.column.clone(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Keyed constraint categories, ordered by priority (`Primary` strongest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyKind {
    Index,
    Unique,
    Primary,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::Index => "index",
            KeyKind::Unique => "unique",
            KeyKind::Primary => "primary",
        }
    }

    /// Categories a lookup for `self` accepts: a unique key is also an index.
    pub fn satisfied_by(self, other: KeyKind) -> bool {
        other >= self
    }
}

/// Fetch path used by constraint caches to read live data.
pub trait RowSource {
    /// Select `columns` of `table`, optionally de-duplicated.
    fn fetch(&mut self, table: &str, columns: &[String], distinct: bool) -> Result<Vec<Row>>;

    /// Current snapshot of a table.
    fn table(&self, name: &str) -> Option<Arc<Table>>;
}

/// Non-unique index. Cache maps a target value to the rest of its row.
#[derive(Debug, Clone)]
pub struct Index {
    name: String,
    target: ColumnKey,
    cache: OnceLock<HashMap<Value, Row>>,
}

impl Index {
    pub fn new(target: ColumnKey, name: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or(KeyKind::Index.as_str()).to_string(),
            target,
            cache: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &ColumnKey {
        &self.target
    }

    /// Build (once) and return the value to row mapping.
    pub fn prepare(&self, source: &mut dyn RowSource) -> Result<&HashMap<Value, Row>> {
        if let Some(cache) = self.cache.get() {
            return Ok(cache);
        }

        let table_name = owning_table(&self.target)?;
        let table = source.table(table_name).ok_or_else(|| {
            Error::InvalidTableReference(format!("unknown table: {table_name}"))
        })?;

        let mut keyed: Vec<String> = table
            .columns()
            .iter()
            .filter(|column| column.constraints().iter().any(|c| c.category().is_some()))
            .map(|column| column.name.clone())
            .collect();
        if !keyed.contains(&self.target.column) {
            keyed.insert(0, self.target.column.clone());
        }

        let rows = source.fetch(table_name, &keyed, false)?;
        let mut map = HashMap::with_capacity(rows.len());
        for mut row in rows {
            if let Some(key) = row.remove(&self.target.column) {
                map.insert(key, row);
            }
        }

        tracing::debug!(
            event = "constraint_cache_built",
            kind = "index",
            target = %self.target,
            entries = map.len()
        );
        Ok(self.cache.get_or_init(|| map))
    }

    /// Keys of the index cache.
    pub fn keys(&self, source: &mut dyn RowSource) -> Result<HashSet<Value>> {
        Ok(self.prepare(source)?.keys().cloned().collect())
    }
}

/// Uniqueness constraint. Cache is the set of values already present.
#[derive(Debug, Clone)]
pub struct Unique {
    name: String,
    target: ColumnKey,
    cache: OnceLock<HashSet<Value>>,
}

impl Unique {
    pub fn new(target: ColumnKey, name: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or(KeyKind::Unique.as_str()).to_string(),
            target,
            cache: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &ColumnKey {
        &self.target
    }

    pub fn prepare(&self, source: &mut dyn RowSource) -> Result<&HashSet<Value>> {
        if let Some(cache) = self.cache.get() {
            return Ok(cache);
        }

        let table_name = owning_table(&self.target)?;
        let rows = source.fetch(table_name, std::slice::from_ref(&self.target.column), true)?;
        let values: HashSet<Value> = rows
            .into_iter()
            .filter_map(|mut row| row.remove(&self.target.column))
            .collect();

        tracing::debug!(
            event = "constraint_cache_built",
            kind = "unique",
            target = %self.target,
            entries = values.len()
        );
        Ok(self.cache.get_or_init(|| values))
    }

    /// Fails when `value` is already present.
    pub fn validate(&self, value: &Value, source: &mut dyn RowSource) -> Result<&Self> {
        if self.prepare(source)?.contains(value) {
            return Err(Error::ConstraintViolation(format!(
                "{value} is not unique in {}",
                self.target
            )));
        }
        Ok(self)
    }
}

/// Primary key: a unique constraint on a non-nullable column.
#[derive(Debug, Clone)]
pub struct PrimaryKey {
    unique: Unique,
}

impl PrimaryKey {
    /// Fails when the target column is nullable.
    pub fn new(target: ColumnKey, nullable: bool, name: Option<&str>) -> Result<Self> {
        if nullable {
            return Err(Error::ConstraintViolation(format!(
                "primary key may only be created if {target} is NOT NULL"
            )));
        }
        Ok(Self::not_null(target, name))
    }

    /// Primary key on a column already known to be NOT NULL.
    pub(crate) fn not_null(target: ColumnKey, name: Option<&str>) -> Self {
        let name = name.unwrap_or(KeyKind::Primary.as_str());
        Self {
            unique: Unique::new(target, Some(name)),
        }
    }

    pub fn target(&self) -> &ColumnKey {
        &self.unique.target
    }

    pub fn as_unique(&self) -> &Unique {
        &self.unique
    }

    pub fn validate(&self, value: &Value, source: &mut dyn RowSource) -> Result<&Self> {
        self.unique.validate(value, source)?;
        Ok(self)
    }
}

/// Foreign key from `target` to `foreign` in another table.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    name: String,
    target: ColumnKey,
    foreign: ColumnKey,
    cache: OnceLock<HashSet<Value>>,
}

impl ForeignKey {
    /// Fails when both columns belong to the same table.
    pub fn new(target: ColumnKey, foreign: ColumnKey, name: Option<&str>) -> Result<Self> {
        if target.table == foreign.table {
            return Err(Error::ConstraintViolation(format!(
                "cannot foreign key a table on itself: {target} -> {foreign}"
            )));
        }
        let name = match name {
            Some(name) => name.to_string(),
            None => Self::default_name(&target, &foreign),
        };
        Ok(Self {
            name,
            target,
            foreign,
            cache: OnceLock::new(),
        })
    }

    /// `fk_<table>_<column>_<foreign column>`.
    pub fn default_name(target: &ColumnKey, foreign: &ColumnKey) -> String {
        format!(
            "fk_{}_{}_{}",
            target.table.as_deref().unwrap_or_default(),
            target.column,
            foreign.column
        )
    }

    pub fn target(&self) -> &ColumnKey {
        &self.target
    }

    pub fn foreign(&self) -> &ColumnKey {
        &self.foreign
    }

    /// Build (once) the set of keys of the foreign column's index.
    pub fn prepare(&self, source: &mut dyn RowSource) -> Result<&HashSet<Value>> {
        if let Some(cache) = self.cache.get() {
            return Ok(cache);
        }

        let table_name = owning_table(&self.foreign)?;
        let table = source.table(table_name).ok_or_else(|| {
            Error::InvalidTableReference(format!("unknown table: {table_name}"))
        })?;
        let column = table.column(&self.foreign.column).ok_or_else(|| {
            Error::SemanticField(format!("unknown foreign column: {}", self.foreign))
        })?;
        let keys = match column.find_constraint(KeyKind::Index.as_str()) {
            Some(Constraint::Index(index)) => index.keys(source)?,
            Some(Constraint::Unique(unique)) => unique.prepare(source)?.clone(),
            Some(Constraint::PrimaryKey(primary)) => primary.as_unique().prepare(source)?.clone(),
            _ => {
                return Err(Error::ConstraintViolation(format!(
                    "foreign column {} has no index",
                    self.foreign
                )));
            }
        };

        tracing::debug!(
            event = "constraint_cache_built",
            kind = "foreign_key",
            target = %self.target,
            foreign = %self.foreign,
            entries = keys.len()
        );
        Ok(self.cache.get_or_init(|| keys))
    }

    /// Fails when `value` is not a key of the foreign column.
    pub fn validate(&self, value: &Value, source: &mut dyn RowSource) -> Result<&Self> {
        if !self.prepare(source)?.contains(value) {
            return Err(Error::ConstraintViolation(format!(
                "{value} is not a key of {}",
                self.foreign
            )));
        }
        Ok(self)
    }
}

/// A named rule attached to one column, or two for foreign keys.
#[derive(Debug, Clone)]
pub enum Constraint {
    Index(Index),
    Unique(Unique),
    PrimaryKey(PrimaryKey),
    ForeignKey(ForeignKey),
}

impl Constraint {
    /// Keyed category, `None` for foreign keys.
    pub fn category(&self) -> Option<KeyKind> {
        match self {
            Constraint::Index(_) => Some(KeyKind::Index),
            Constraint::Unique(_) => Some(KeyKind::Unique),
            Constraint::PrimaryKey(_) => Some(KeyKind::Primary),
            Constraint::ForeignKey(_) => None,
        }
    }

    pub fn target(&self) -> &ColumnKey {
        match self {
            Constraint::Index(index) => index.target(),
            Constraint::Unique(unique) => unique.target(),
            Constraint::PrimaryKey(primary) => primary.target(),
            Constraint::ForeignKey(fk) => fk.target(),
        }
    }

    /// Run this constraint's check against `value`.
    ///
    /// Indexes accept every value; they only build their cache.
    pub fn validate(&self, value: &Value, source: &mut dyn RowSource) -> Result<&Self> {
        match self {
            Constraint::Index(index) => {
                index.prepare(source)?;
            }
            Constraint::Unique(unique) => {
                unique.validate(value, source)?;
            }
            Constraint::PrimaryKey(primary) => {
                primary.validate(value, source)?;
            }
            Constraint::ForeignKey(fk) => {
                fk.validate(value, source)?;
            }
        }
        Ok(self)
    }

    /// Whether this constraint answers a category or name lookup.
    pub fn matches(&self, lookup: &Lookup<'_>) -> bool {
        match lookup {
            Lookup::Category(kind) => self.category().is_some_and(|own| kind.satisfied_by(own)),
            Lookup::Name(name) => self.name() == *name,
        }
    }

    /// Point column references at `new` where they used to name `old`.
    pub(crate) fn retarget(&mut self, old: &ColumnKey, new: &ColumnKey) {
        let replace = |key: &mut ColumnKey| {
            if key == old {
                *key = new.clone();
            }
        };
        match self {
            Constraint::Index(index) => replace(&mut index.target),
            Constraint::Unique(unique) => replace(&mut unique.target),
            Constraint::PrimaryKey(primary) => replace(&mut primary.unique.target),
            Constraint::ForeignKey(fk) => {
                replace(&mut fk.target);
                replace(&mut fk.foreign);
            }
        }
    }
}

impl Named for Constraint {
    fn name(&self) -> &str {
        match self {
            Constraint::Index(index) => &index.name,
            Constraint::Unique(unique) => &unique.name,
            Constraint::PrimaryKey(primary) => &primary.unique.name,
            Constraint::ForeignKey(fk) => &fk.name,
        }
    }
}

// Caches are not part of a constraint's identity.
impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constraint::ForeignKey(a), Constraint::ForeignKey(b)) => {
                a.name == b.name && a.target == b.target && a.foreign == b.foreign
            }
            (Constraint::ForeignKey(_), _) | (_, Constraint::ForeignKey(_)) => false,
            _ => {
                self.category() == other.category()
                    && self.name() == other.name()
                    && self.target() == other.target()
            }
        }
    }
}

/// Constraint lookup: a keyed category or an exact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Category(KeyKind),
    Name(&'a str),
}

impl<'a> Lookup<'a> {
    /// `index`, `unique` and `primary` (any case) are categories, anything else a name.
    pub fn parse(raw: &'a str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "index" => Lookup::Category(KeyKind::Index),
            "unique" => Lookup::Category(KeyKind::Unique),
            "primary" => Lookup::Category(KeyKind::Primary),
            _ => Lookup::Name(raw),
        }
    }
}

fn owning_table(key: &ColumnKey) -> Result<&str> {
    key.table
        .as_deref()
        .ok_or_else(|| Error::SemanticField(format!("column {} has no owning table", key.column)))
}

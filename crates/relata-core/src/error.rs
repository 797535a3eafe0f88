use thiserror::Error;

/// Longest constraint name accepted by the supported engines.
pub const MAX_NAME_LEN: usize = 64;

/// Core error type shared across relata crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The database has no open connection.
    #[error("connection is not open")]
    ConnectionNotOpen,
    /// The method keyword string does not name a known operation.
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    /// The table reference is unknown, or already exists when it must not.
    #[error("invalid table reference: {0}")]
    InvalidTableReference(String),
    /// Fields or modifiers have the wrong shape or type.
    #[error("structural field error: {0}")]
    StructuralField(String),
    /// A column definition string could not be parsed.
    #[error("invalid column definition: {0}")]
    InvalidDefinition(String),
    /// Fields are well formed but do not fit the schema.
    #[error("semantic field error: {0}")]
    SemanticField(String),
    /// A unique, primary or foreign key check failed.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// A constraint name exceeds [`MAX_NAME_LEN`].
    #[error("name `{name}` is longer than {max} characters")]
    NameTooLong { name: String, max: usize },
    /// Transport failure reported by the executor.
    #[error("executor error: {0}")]
    Executor(String),
    /// Translate or interpret called on a request that never validated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for wrong-shape errors, which are always reported first.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::StructuralField(_) | Error::InvalidDefinition(_))
    }

    /// Returns true for errors about values that do not fit the schema.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            Error::SemanticField(_) | Error::ConstraintViolation(_) | Error::NameTooLong { .. }
        )
    }
}

/// Convenience alias for results returned by relata crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Reject names longer than [`MAX_NAME_LEN`].
pub fn check_name_len(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(Error::NameTooLong {
            name: name.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

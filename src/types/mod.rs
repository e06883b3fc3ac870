//! Crate-wide error type and result alias.

#![forbid(unsafe_code)]

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Maximum nesting of joined relations (and the entities built from them)
/// that name resolution will walk before giving up.
pub const MAX_JOIN_DEPTH: usize = 128;

/// Errors surfaced by relations, entities, and the storage layer.
#[derive(Debug, Error)]
pub enum TabulaError {
    /// A parameter had the wrong shape or value for the operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A table, column, or alias token is not safe to splice into SQL.
    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),
    /// No relation or entity along the probed path owns the column.
    #[error("column '{column}' does not exist")]
    ColumnNotFound {
        /// Column as it was requested.
        column: String,
    },
    /// Both sides of a join own the column.
    #[error("column '{column}' is ambiguous")]
    AmbiguousColumn {
        /// Column as it was requested.
        column: String,
    },
    /// Both sides of a joined entity answer to the table name or alias.
    #[error("table or alias '{name}' is ambiguous")]
    AmbiguousTable {
        /// Table name or alias as it was requested.
        name: String,
    },
    /// `put` was given a mapping without one of the declared columns.
    #[error("cannot put entity which is missing column '{column}'")]
    MissingColumn {
        /// Declared column absent from the input.
        column: String,
    },
    /// An alias was attached to something that cannot carry one.
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    /// The two sides of a join were registered in different registries.
    #[error("joined relations must be managed by the same registry")]
    CrossRegistry,
    /// Join nesting went past [`MAX_JOIN_DEPTH`].
    #[error("join depth limit of {limit} exceeded")]
    JoinDepthExceeded {
        /// The configured ceiling.
        limit: usize,
    },
    /// A read expected a specific number of rows.
    #[error("expected {expected} result, got {found}")]
    UnexpectedResultCount {
        /// Human readable expectation, e.g. "exactly one".
        expected: &'static str,
        /// Number of rows actually returned.
        found: usize,
    },
    /// SQLite rejected a write because of a constraint (unique, foreign key, not null).
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),
    /// Any other failure reported by SQLite.
    #[error("storage execution failed: {0}")]
    StorageExecution(#[source] rusqlite::Error),
    /// The operation has no meaning for this kind of relation or entity.
    #[error("{0} is not supported")]
    NotSupported(&'static str),
    /// Dynamic member access found neither a column nor a child table.
    #[error("no such member, table, or column '{0}'")]
    NoSuchMember(String),
    /// The registry does not manage the table, or the table does not exist.
    #[error("table '{0}' is not managed")]
    UnknownTable(String),
    /// A managed table lacks the mandatory `id` primary key.
    #[error("table '{table}' must have a column 'id' which is the primary key")]
    MissingPrimaryKey {
        /// Offending table.
        table: String,
    },
    /// The database file does not exist and creation was disabled.
    #[error("database not found: {0}")]
    MissingDatabase(PathBuf),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TabulaError>;

impl From<rusqlite::Error> for TabulaError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => TabulaError::ConstraintViolation(err),
            _ => TabulaError::StorageExecution(err),
        }
    }
}

impl TabulaError {
    pub(crate) fn column_not_found(column: impl ToString) -> Self {
        TabulaError::ColumnNotFound {
            column: column.to_string(),
        }
    }

    pub(crate) fn ambiguous_column(column: impl ToString) -> Self {
        TabulaError::AmbiguousColumn {
            column: column.to_string(),
        }
    }

    pub(crate) fn depth_exceeded() -> Self {
        TabulaError::JoinDepthExceeded {
            limit: MAX_JOIN_DEPTH,
        }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            TabulaError::InvalidArgument(_) => "InvalidArgument",
            TabulaError::InvalidIdentifier(_) => "InvalidIdentifier",
            TabulaError::ColumnNotFound { .. } => "ColumnNotFound",
            TabulaError::AmbiguousColumn { .. } => "AmbiguousColumn",
            TabulaError::AmbiguousTable { .. } => "AmbiguousTable",
            TabulaError::MissingColumn { .. } => "MissingColumn",
            TabulaError::InvalidAlias(_) => "InvalidAlias",
            TabulaError::CrossRegistry => "CrossRegistry",
            TabulaError::JoinDepthExceeded { .. } => "JoinDepthExceeded",
            TabulaError::UnexpectedResultCount { .. } => "UnexpectedResultCount",
            TabulaError::ConstraintViolation(_) => "ConstraintViolation",
            TabulaError::StorageExecution(_) => "StorageExecutionError",
            TabulaError::NotSupported(_) => "NotSupported",
            TabulaError::NoSuchMember(_) => "NoSuchMember",
            TabulaError::UnknownTable(_) => "UnknownTable",
            TabulaError::MissingPrimaryKey { .. } => "MissingPrimaryKey",
            TabulaError::MissingDatabase(_) => "MissingDatabase",
            TabulaError::Io(_) => "Io",
        }
    }
}

/// Turns a [`TabulaError::ColumnNotFound`] into `Ok(None)` and passes every
/// other outcome through.
///
/// Probing both sides of a join for a column is the normal resolution
/// mechanism, so a miss on one side must not abort the probe.
pub(crate) fn absent_if_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(TabulaError::ColumnNotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

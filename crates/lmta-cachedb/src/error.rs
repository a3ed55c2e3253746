//! Error types for the caching database layer.

use thiserror::Error;

use crate::backend::BoxError;

/// Result type alias for caching database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors that can occur while routing, accumulating, or persisting queries.
#[derive(Error, Debug)]
pub enum DbError {
    /// A query was issued with neither a cache nor a remote connection open.
    #[error("no database backend available to satisfy query")]
    NoBackendAvailable,

    /// A backend reported a placeholder convention this layer cannot map.
    #[error("unsupported paramstyle: {0}")]
    UnsupportedParamStyle(String),

    /// A table descriptor failed validation (empty or malformed primary key).
    #[error("invalid schema for table {table}: {reason}")]
    InvalidSchema { table: String, reason: String },

    /// Rows accumulated under one table name disagree on field count.
    #[error("table {table} contains non-uniform rows (expected {expected} fields, got {actual})")]
    NonUniformRows {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// The destination store rejected the table's create statement.
    #[error("failed to create table {table} in destination: {source}")]
    SchemaCreationFailed {
        table: String,
        source: rusqlite::Error,
    },

    /// Local cache store error (open failure, corruption, SQL syntax).
    #[error("cache database error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// Remote backend error, propagated verbatim so callers can tell
    /// transient remote failures apart from local cache problems.
    #[error("remote database error: {0}")]
    Remote(#[source] BoxError),
}

impl DbError {
    /// Wrap a backend-reported error without rewording it.
    pub fn remote(err: BoxError) -> Self {
        DbError::Remote(err)
    }
}

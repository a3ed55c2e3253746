//! Error types for LMT database retrieval.

use chrono::NaiveDateTime;
use thiserror::Error;

use lmta_cachedb::DbError;

/// Result type alias for LMT database operations.
pub type Result<T> = std::result::Result<T, LmtError>;

/// Errors that can occur while fetching or archiving LMT data.
#[derive(Error, Debug)]
pub enum LmtError {
    /// The requested table is not in the LMT schema registry.
    #[error("unknown LMT table: {0}")]
    UnknownTable(String),

    /// The caller's time window is empty or inverted.
    #[error("invalid time range: start {start} is not before end {end}")]
    InvalidTimeRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// The chunk width must be strictly positive.
    #[error("time chunk must be positive, got {0}s")]
    InvalidTimechunk(i64),

    /// A timestamp argument failed to parse.
    #[error("bad timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Error from the underlying caching layer or its backends.
    #[error(transparent)]
    Db(#[from] DbError),
}

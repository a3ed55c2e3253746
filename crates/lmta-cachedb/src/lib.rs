//! Tiered query routing with a persistent SQLite caching layer.
//!
//! This crate provides:
//! - A paramstyle resolver for driver-agnostic query templates
//! - [`CachingDb`], a router that serves queries from a local cache file
//!   when one is open and from a remote backend otherwise
//! - An in-memory result accumulator keyed by logical table name
//! - An idempotent persister that flushes accumulated results to an
//!   SQLite file with insert-or-replace semantics
//!
//! The remote backend is opaque: anything implementing [`RemoteDriver`]
//! and [`RemoteConnection`] can serve queries. The data in both backends
//! is assumed immutable and primary-keyed, which is what makes replaying
//! overlapping queries into the cache harmless.

pub mod backend;
pub mod db;
pub mod error;
pub mod paramstyle;
pub mod value;

pub use backend::{BoxError, RemoteConnection, RemoteCredentials, RemoteDriver};
pub use db::{CachingDb, PersistReport, PersistWarning, QueryOutcome, SaveTo, TableWrite};
pub use error::{DbError, Result};
pub use paramstyle::{paramstyle_symbol, PARAM_MARKER, SQLITE_PARAMSTYLE};
pub use value::{Row, TableSchema, Value};

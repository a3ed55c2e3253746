//! Interface to an LMT telemetry database through the caching layer.
//!
//! This crate provides:
//! - A static registry of the LMT table schemas worth caching
//! - [`LmtDb`], a wrapper over [`lmta_cachedb::CachingDb`] that breaks
//!   time-window queries into bounded chunks
//! - Whole-table archival over a resolved timestamp-ID window
//! - Remote credential loading from the environment

pub mod config;
pub mod error;
pub mod fetch;
pub mod schema;

pub use config::credentials_from_env;
pub use error::{LmtError, Result};
pub use fetch::{default_timechunk, LmtDb, TimeseriesSlice, DATE_FMT};
pub use schema::{table_names, table_schema};

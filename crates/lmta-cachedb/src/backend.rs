//! Remote backend boundary.
//!
//! The caching layer treats the remote relational source as opaque: it
//! only needs an open operation taking credentials and a cursor-style
//! fetch-all over a parameterized query. Concrete drivers live outside
//! this crate and plug in through [`RemoteDriver`].

use crate::value::{Row, Value};

/// Boxed error type carried verbatim from a remote driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Credentials for opening a remote relational connection.
#[derive(Debug, Clone)]
pub struct RemoteCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

/// A live connection to a remote relational source.
pub trait RemoteConnection {
    /// The driver-reported placeholder convention (PEP-0249 vocabulary,
    /// e.g. `qmark` or `format`).
    fn paramstyle(&self) -> &str;

    /// Execute a parameterized query and return all rows, in order.
    fn fetch_all(&mut self, query: &str, params: &[Value]) -> Result<Vec<Row>, BoxError>;
}

/// Factory for remote connections.
pub trait RemoteDriver {
    fn open(&self, credentials: &RemoteCredentials) -> Result<Box<dyn RemoteConnection>, BoxError>;
}

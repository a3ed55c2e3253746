//! Tiered query router, in-memory accumulator, and idempotent persister.
//!
//! [`CachingDb`] holds at most one open cache connection (SQLite file)
//! and at most one remote connection. When both are configured the cache
//! is authoritative: the remote handle is discarded at open time with a
//! single warning, so query routing is never ambiguous.
//!
//! Results of queries issued under a logical table name accumulate in
//! memory, append-only and insertion-ordered, until [`CachingDb::persist`]
//! replays them into a destination file with insert-or-replace semantics.
//! Because the source data is immutable and primary-keyed, re-fetching an
//! overlapping window and persisting again is idempotent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection};
use tracing::{debug, warn};

use crate::backend::{RemoteConnection, RemoteCredentials, RemoteDriver};
use crate::error::{DbError, Result};
use crate::paramstyle::{paramstyle_symbol, PARAM_MARKER, SQLITE_PARAMSTYLE};
use crate::value::{Row, TableSchema, Value};

/// Which backend satisfied the most recent query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Served by the local cache file.
    Cache,
    /// Served by the remote source.
    Remote,
}

/// Destination for a query's rows in the in-memory accumulator.
#[derive(Debug, Clone, Copy)]
pub struct SaveTo<'a> {
    table: &'a str,
    schema: Option<&'a TableSchema>,
}

impl<'a> SaveTo<'a> {
    /// Accumulate rows under `table` with no descriptor.
    pub fn table(table: &'a str) -> Self {
        Self {
            table,
            schema: None,
        }
    }

    /// Attach a descriptor; the most recently supplied one is retained.
    pub fn with_schema(mut self, schema: &'a TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Accumulated state for one logical table.
#[derive(Debug, Default)]
struct SavedTable {
    rows: Vec<Row>,
    schema: Option<TableSchema>,
}

struct CacheHandle {
    path: PathBuf,
    conn: Connection,
    symbol: &'static str,
}

impl CacheHandle {
    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ncols = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(ncols);
            for i in 0..ncols {
                fields.push(Value::from(row.get_ref(i)?));
            }
            out.push(fields);
        }
        Ok(out)
    }
}

struct RemoteHandle {
    conn: Box<dyn RemoteConnection>,
    symbol: &'static str,
}

/// One table successfully written by a persist operation.
#[derive(Debug, Clone)]
pub struct TableWrite {
    pub table: String,
    pub rows: usize,
}

/// One table skipped by a persist operation, with the reason.
#[derive(Debug)]
pub struct PersistWarning {
    pub table: String,
    pub error: DbError,
}

/// Outcome of a persist operation: per-table writes plus the batch of
/// per-table warnings. Tables that warned keep their in-memory buffers
/// for retry.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<TableWrite>,
    pub warnings: Vec<PersistWarning>,
}

impl PersistReport {
    /// True when every non-empty table was written.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Total rows written across all tables.
    pub fn rows_written(&self) -> usize {
        self.written.iter().map(|w| w.rows).sum()
    }
}

/// Relational connection with an optional caching layer interposed.
pub struct CachingDb {
    cache: Option<CacheHandle>,
    remote: Option<RemoteHandle>,
    saved: BTreeMap<String, SavedTable>,
    last_outcome: Option<QueryOutcome>,
    queries_issued: u64,
}

impl Default for CachingDb {
    fn default() -> Self {
        Self::new()
    }
}

impl CachingDb {
    /// Create a router with no backends open.
    pub fn new() -> Self {
        Self {
            cache: None,
            remote: None,
            saved: BTreeMap::new(),
            last_outcome: None,
            queries_issued: 0,
        }
    }

    /// Open a router, connecting the cache and/or remote backends.
    ///
    /// When both are requested the remote open is attempted and the
    /// handle immediately discarded with a warning; the cache remains
    /// authoritative.
    pub fn open(
        cache_file: Option<&Path>,
        remote: Option<(&dyn RemoteDriver, &RemoteCredentials)>,
    ) -> Result<Self> {
        let mut db = Self::new();
        if let Some(path) = cache_file {
            db.connect_cache(path)?;
        }
        if let Some((driver, credentials)) = remote {
            db.connect_remote(driver, credentials)?;
        }
        Ok(db)
    }

    /// Open (or replace) the cache connection.
    pub fn connect_cache(&mut self, path: &Path) -> Result<()> {
        let conn = Connection::open(path)?;
        let symbol = paramstyle_symbol(SQLITE_PARAMSTYLE)?;
        if self.remote.is_some() {
            warn!("cache and remote both open; cache takes precedence for all queries");
        }
        self.cache = Some(CacheHandle {
            path: path.to_path_buf(),
            conn,
            symbol,
        });
        Ok(())
    }

    /// Open a remote connection through `driver`.
    ///
    /// If a cache connection is already open the freshly opened remote
    /// handle is dropped and the cache stays authoritative.
    pub fn connect_remote(
        &mut self,
        driver: &dyn RemoteDriver,
        credentials: &RemoteCredentials,
    ) -> Result<()> {
        let conn = driver.open(credentials).map_err(DbError::remote)?;
        if self.cache.is_some() {
            warn!("cache and remote both configured; discarding remote connection");
            return Ok(());
        }
        let symbol = paramstyle_symbol(conn.paramstyle())?;
        self.remote = Some(RemoteHandle { conn, symbol });
        Ok(())
    }

    /// Release the remote connection only. The cache connection is
    /// released by [`CachingDb::close_cache`] so a backend switch does
    /// not destroy cache state.
    pub fn close(&mut self) {
        self.remote = None;
    }

    /// Release the cache connection.
    pub fn close_cache(&mut self) {
        self.cache = None;
    }

    /// Path of the currently open cache file, if any.
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache.as_ref().map(|c| c.path.as_path())
    }

    /// Whether a cache connection is open.
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Whether a remote connection is open.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Which backend satisfied the most recent query.
    pub fn last_outcome(&self) -> Option<QueryOutcome> {
        self.last_outcome
    }

    /// Number of queries issued against either backend since construction.
    pub fn queries_issued(&self) -> u64 {
        self.queries_issued
    }

    /// Execute a query against the active backend and return its rows.
    ///
    /// The template is whitespace-collapsed and any `{ps}` markers are
    /// replaced with the active backend's placeholder symbol. No SQL
    /// validation happens here; malformed templates surface the backend's
    /// own syntax error. When `save` names a table, the returned rows
    /// (and descriptor, if attached) are appended to the accumulator.
    pub fn query(
        &mut self,
        template: &str,
        params: &[Value],
        save: Option<SaveTo<'_>>,
    ) -> Result<Vec<Row>> {
        let query = collapse_whitespace(template);
        let rows = if let Some(cache) = self.cache.as_ref() {
            let sql = query.replace(PARAM_MARKER, cache.symbol);
            let rows = cache.fetch_all(&sql, params)?;
            self.last_outcome = Some(QueryOutcome::Cache);
            rows
        } else if let Some(remote) = self.remote.as_mut() {
            let sql = query.replace(PARAM_MARKER, remote.symbol);
            let rows = remote
                .conn
                .fetch_all(&sql, params)
                .map_err(DbError::remote)?;
            self.last_outcome = Some(QueryOutcome::Remote);
            rows
        } else {
            return Err(DbError::NoBackendAvailable);
        };
        self.queries_issued += 1;
        if let Some(save) = save {
            self.append_rows(save, &rows)?;
        }
        Ok(rows)
    }

    /// Rows accumulated under `table` so far (empty if the table is unknown).
    pub fn saved_rows(&self, table: &str) -> &[Row] {
        self.saved
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    /// Number of rows accumulated under `table`.
    pub fn saved_row_count(&self, table: &str) -> usize {
        self.saved.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Names of tables with accumulated state.
    pub fn saved_tables(&self) -> impl Iterator<Item = &str> {
        self.saved.keys().map(String::as_str)
    }

    /// Flush accumulated results from memory without persisting them.
    ///
    /// With `tables` given, only those tables are dropped; otherwise
    /// everything is.
    pub fn drop_saved(&mut self, tables: Option<&[&str]>) {
        match tables {
            None => self.saved.clear(),
            Some(names) => {
                for name in names {
                    self.saved.remove(*name);
                }
            }
        }
    }

    /// Flush the accumulator to `destination`, creating tables as needed
    /// and writing rows with insert-or-replace semantics.
    ///
    /// Per-table failures are isolated: an offending table is skipped
    /// with a warning (buffer retained for retry) and the remaining
    /// tables are still written. Only a failure to open the destination
    /// itself is fatal. When `destination` differs from the open cache
    /// file, a scoped connection is opened and dropped on exit, so the
    /// open cache connection is never disturbed, error paths included.
    pub fn persist(&mut self, destination: &Path) -> Result<PersistReport> {
        let report = match self.cache.as_ref().filter(|c| c.path == destination) {
            Some(cache) => persist_into(&cache.conn, &mut self.saved),
            None => {
                let conn = Connection::open(destination)?;
                persist_into(&conn, &mut self.saved)
            }
        };
        Ok(report)
    }

    /// Append rows (and an optional descriptor) to a table's accumulated
    /// state, validating arity against the declared column count.
    fn append_rows(&mut self, save: SaveTo<'_>, rows: &[Row]) -> Result<()> {
        if let Some(schema) = save.schema {
            schema.validate(save.table)?;
        }

        // Validate before touching the map so a rejected append leaves
        // no empty entry behind. The most recently supplied non-null
        // descriptor wins.
        let effective = save
            .schema
            .or_else(|| self.saved.get(save.table).and_then(|t| t.schema.as_ref()));
        if let Some(schema) = effective {
            let expected = schema.columns.len();
            if let Some(bad) = rows.iter().find(|r| r.len() != expected) {
                return Err(DbError::NonUniformRows {
                    table: save.table.to_string(),
                    expected,
                    actual: bad.len(),
                });
            }
        }

        let entry = self.saved.entry(save.table.to_string()).or_default();
        if let Some(schema) = save.schema {
            entry.schema = Some(schema.clone());
        }
        entry.rows.extend(rows.iter().cloned());
        debug!(
            table = save.table,
            appended = rows.len(),
            total = entry.rows.len(),
            "accumulated query results"
        );
        Ok(())
    }
}

/// Write every non-empty table buffer into `conn`, dropping buffers only
/// after their table committed.
fn persist_into(conn: &Connection, saved: &mut BTreeMap<String, SavedTable>) -> PersistReport {
    let mut report = PersistReport::default();
    let mut committed = Vec::new();

    for (table, state) in saved.iter() {
        if state.rows.is_empty() {
            warn!(table = %table, "table has no rows; skipping");
            continue;
        }
        match persist_table(conn, table, state) {
            Ok(rows) => {
                debug!(table = %table, rows, "table persisted");
                committed.push(table.clone());
                report.written.push(TableWrite {
                    table: table.clone(),
                    rows,
                });
            }
            Err(error) => {
                warn!(table = %table, %error, "table not persisted; buffer retained");
                report.warnings.push(PersistWarning {
                    table: table.clone(),
                    error,
                });
            }
        }
    }

    for table in committed {
        saved.remove(&table);
    }
    report
}

fn persist_table(conn: &Connection, table: &str, state: &SavedTable) -> Result<usize> {
    // Rows must agree on field count before they can share a schema.
    let arity = state.rows[0].len();
    if let Some(bad) = state.rows.iter().find(|r| r.len() != arity) {
        return Err(DbError::NonUniformRows {
            table: table.to_string(),
            expected: arity,
            actual: bad.len(),
        });
    }

    if let Some(schema) = &state.schema {
        conn.execute(&schema.create_statement(table), [])
            .map_err(|source| DbError::SchemaCreationFailed {
                table: table.to_string(),
                source,
            })?;
    }

    // INSERT OR REPLACE so that re-persisting an overlapping fetch never
    // duplicates a primary key.
    let placeholders = vec!["?"; arity].join(", ");
    let sql = format!("INSERT OR REPLACE INTO {table} VALUES ({placeholders})");
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for row in &state.rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
    }
    tx.commit()?;
    Ok(state.rows.len())
}

/// Collapse runs of whitespace so multi-line templates log and compare
/// cleanly.
fn collapse_whitespace(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

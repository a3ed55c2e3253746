//! Time-window chunked retrieval from an LMT database.
//!
//! The fact tables (`OST_DATA` and friends) are joined to the
//! `TIMESTAMP_INFO` dimension on every query, and that join scales with
//! the product of matched rows on both sides. [`LmtDb`] therefore
//! resolves the caller's time window to a `TS_ID` range once, then walks
//! the window in fixed-width chunks, issuing one bounded query per chunk
//! under a shared logical table name so the full result assembles
//! incrementally in the caching layer's accumulator.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use lmta_cachedb::{
    CachingDb, PersistReport, RemoteCredentials, RemoteDriver, Row, SaveTo, TableSchema, Value,
};

use crate::error::{LmtError, Result};
use crate::schema;

/// Timestamp format exchanged with the database.
pub const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Default chunk width for time-window queries.
pub fn default_timechunk() -> Duration {
    Duration::hours(1)
}

/// Rows contributed by a single fetch, with their ordered column names.
///
/// This is the delta slice: only what the fetch appended to the
/// accumulator, never previously accumulated history.
#[derive(Debug, Clone)]
pub struct TimeseriesSlice {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Connection to an LMT database, remote or cached.
pub struct LmtDb {
    db: CachingDb,
    ost_names: Vec<String>,
    ost_id_map: BTreeMap<i64, String>,
    oss_names: Vec<String>,
    oss_id_map: BTreeMap<i64, String>,
    mds_names: Vec<String>,
    mds_id_map: BTreeMap<i64, String>,
    mds_op_names: Vec<String>,
    mds_op_id_map: BTreeMap<i64, String>,
}

impl LmtDb {
    /// Open against a local cache file only.
    pub fn from_cache_file(path: &Path) -> Result<Self> {
        Self::open(Some(path), None)
    }

    /// Open against a remote source only.
    pub fn from_remote(
        driver: &dyn RemoteDriver,
        credentials: &RemoteCredentials,
    ) -> Result<Self> {
        Self::open(None, Some((driver, credentials)))
    }

    /// Open with any combination of cache file and remote source.
    ///
    /// The device and operation name maps are immutable properties of a
    /// database, so they are fetched once here.
    pub fn open(
        cache_file: Option<&Path>,
        remote: Option<(&dyn RemoteDriver, &RemoteCredentials)>,
    ) -> Result<Self> {
        let mut db = CachingDb::open(cache_file, remote)?;

        let (ost_names, ost_id_map) =
            load_name_map(&mut db, "SELECT OST_ID, OST_NAME FROM OST_INFO")?;
        let (oss_names, oss_id_map) =
            load_name_map(&mut db, "SELECT OSS_ID, HOSTNAME FROM OSS_INFO")?;
        let (mds_names, mds_id_map) =
            load_name_map(&mut db, "SELECT MDS_ID, HOSTNAME FROM MDS_INFO")?;
        let (mds_op_names, mds_op_id_map) = load_name_map(
            &mut db,
            "SELECT OPERATION_ID, OPERATION_NAME FROM OPERATION_INFO",
        )?;

        Ok(Self {
            db,
            ost_names,
            ost_id_map,
            oss_names,
            oss_id_map,
            mds_names,
            mds_id_map,
            mds_op_names,
            mds_op_id_map,
        })
    }

    /// The underlying router, for diagnostics (outcome tag, query count).
    pub fn db(&self) -> &CachingDb {
        &self.db
    }

    /// OST names, in the order reported by `OST_INFO`.
    pub fn ost_names(&self) -> &[String] {
        &self.ost_names
    }

    /// OST name for an `OST_ID`, if known.
    pub fn ost_name(&self, id: i64) -> Option<&str> {
        self.ost_id_map.get(&id).map(String::as_str)
    }

    /// OSS hostnames, in the order reported by `OSS_INFO`.
    pub fn oss_names(&self) -> &[String] {
        &self.oss_names
    }

    /// OSS hostname for an `OSS_ID`, if known.
    pub fn oss_name(&self, id: i64) -> Option<&str> {
        self.oss_id_map.get(&id).map(String::as_str)
    }

    /// MDS hostnames, in the order reported by `MDS_INFO`.
    pub fn mds_names(&self) -> &[String] {
        &self.mds_names
    }

    /// MDS hostname for an `MDS_ID`, if known.
    pub fn mds_name(&self, id: i64) -> Option<&str> {
        self.mds_id_map.get(&id).map(String::as_str)
    }

    /// Metadata operation names, in the order reported by `OPERATION_INFO`.
    pub fn mds_op_names(&self) -> &[String] {
        &self.mds_op_names
    }

    /// Metadata operation name for an `OPERATION_ID`, if known.
    pub fn mds_op_name(&self, id: i64) -> Option<&str> {
        self.mds_op_id_map.get(&id).map(String::as_str)
    }

    /// Resolve a time window to the lowest and highest `TS_ID` whose
    /// timestamps fall within it, inclusive.
    ///
    /// Returns `None` when no timestamps match, which callers treat as
    /// an empty window rather than an error.
    pub fn ts_id_bounds(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Option<(i64, i64)>> {
        check_range(start, end)?;
        let rows = self.db.query(
            "SELECT MIN(TS_ID), MAX(TS_ID) FROM TIMESTAMP_INFO
             WHERE TIMESTAMP >= {ps} AND TIMESTAMP <= {ps}",
            &[stamp(start), stamp(end)],
            None,
        )?;
        let bounds = rows.first().and_then(|row| {
            let min = row.first().and_then(Value::as_i64)?;
            let max = row.get(1).and_then(Value::as_i64)?;
            Some((min, max))
        });
        Ok(bounds)
    }

    /// Fetch `[start, end)` of a fact table, one query per time chunk.
    ///
    /// All chunks accumulate under the table's registry name, so
    /// repeated fetches build one cumulative result set; the returned
    /// slice holds only the rows this call appended. `timechunk` of
    /// `None` issues a single unchunked query; the final chunk is always
    /// clipped to `end`.
    pub fn get_timeseries_data(
        &mut self,
        table: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        timechunk: Option<Duration>,
    ) -> Result<TimeseriesSlice> {
        let (table, table_schema) =
            schema::table_schema(table).ok_or_else(|| LmtError::UnknownTable(table.to_string()))?;
        check_range(start, end)?;
        if let Some(chunk) = timechunk {
            if chunk <= Duration::zero() {
                return Err(LmtError::InvalidTimechunk(chunk.num_seconds()));
            }
        }

        // Rows carry the joined wall-clock timestamp ahead of the fact
        // columns; the primary key is unchanged.
        let mut result_columns = Vec::with_capacity(table_schema.columns.len() + 1);
        result_columns.push("TIMESTAMP".to_string());
        result_columns.extend(table_schema.columns.iter().cloned());
        let result_schema =
            TableSchema::new(result_columns.clone(), table_schema.primary_key.clone());

        let Some((min_id, max_id)) = self.ts_id_bounds(start, end)? else {
            debug!(table, %start, %end, "no timestamps in window");
            return Ok(TimeseriesSlice {
                columns: result_columns,
                rows: Vec::new(),
            });
        };

        // Qualify TS_ID: it exists on both sides of the join.
        let select_list = result_columns
            .iter()
            .map(|col| {
                if col == "TS_ID" {
                    "TIMESTAMP_INFO.TS_ID".to_string()
                } else {
                    col.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let query = format!(
            "SELECT {select_list}
             FROM {table}
             INNER JOIN TIMESTAMP_INFO ON TIMESTAMP_INFO.TS_ID = {table}.TS_ID
             WHERE TIMESTAMP_INFO.TIMESTAMP >= {{ps}}
               AND TIMESTAMP_INFO.TIMESTAMP < {{ps}}
               AND {table}.TS_ID BETWEEN {min_id} AND {max_id}"
        );

        let index0 = self.db.saved_row_count(table);
        let mut chunk_start = start;
        while chunk_start < end {
            let chunk_end = match timechunk {
                Some(chunk) => std::cmp::min(chunk_start + chunk, end),
                None => end,
            };
            self.db.query(
                &query,
                &[stamp(chunk_start), stamp(chunk_end)],
                Some(SaveTo::table(table).with_schema(&result_schema)),
            )?;
            match timechunk {
                Some(chunk) => chunk_start = chunk_start + chunk,
                None => break,
            }
        }

        let rows = self.db.saved_rows(table)[index0..].to_vec();
        debug!(table, appended = rows.len(), "time window fetched");
        Ok(TimeseriesSlice {
            columns: result_columns,
            rows,
        })
    }

    /// Retrieve OST throughput data for a time window (default chunking).
    pub fn get_ost_data(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeseriesSlice> {
        self.get_timeseries_data("OST_DATA", start, end, Some(default_timechunk()))
    }

    /// Retrieve OSS load data for a time window (default chunking).
    pub fn get_oss_data(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeseriesSlice> {
        self.get_timeseries_data("OSS_DATA", start, end, Some(default_timechunk()))
    }

    /// Retrieve MDS load data for a time window (default chunking).
    pub fn get_mds_data(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeseriesSlice> {
        self.get_timeseries_data("MDS_DATA", start, end, Some(default_timechunk()))
    }

    /// Retrieve metadata operation data for a time window (default chunking).
    pub fn get_mds_ops_data(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeseriesSlice> {
        self.get_timeseries_data("MDS_OPS_DATA", start, end, Some(default_timechunk()))
    }

    /// Accumulate every registry table restricted to a time window.
    ///
    /// Time-indexed tables (those carrying a `TS_ID` column) are
    /// restricted to the window's resolved `TS_ID` range and skipped
    /// entirely when the window resolves empty; time-independent tables
    /// are dumped whole. `limit` caps the rows fetched per table.
    /// Returns the total number of rows accumulated.
    pub fn archive_tables(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        limit: Option<u64>,
    ) -> Result<usize> {
        let bounds = self.ts_id_bounds(start, end)?;
        let mut total = 0;
        for name in schema::table_names() {
            let (_, table_schema) = schema::table_schema(name)
                .ok_or_else(|| LmtError::UnknownTable(name.to_string()))?;
            let time_indexed = table_schema
                .columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case("TS_ID"));

            let mut query = format!("SELECT * FROM {name}");
            if time_indexed {
                let Some((min_id, max_id)) = bounds else {
                    debug!(table = name, "empty window; skipping time-indexed table");
                    continue;
                };
                query.push_str(&format!(" WHERE TS_ID >= {min_id} AND TS_ID <= {max_id}"));
            }
            if let Some(limit) = limit {
                query.push_str(&format!(" LIMIT {limit}"));
            }

            let rows = self.db.query(
                &query,
                &[],
                Some(SaveTo::table(name).with_schema(table_schema)),
            )?;
            total += rows.len();
        }
        Ok(total)
    }

    /// Flush everything accumulated so far to `destination`.
    pub fn persist(&mut self, destination: &Path) -> Result<PersistReport> {
        Ok(self.db.persist(destination)?)
    }

    /// Release the remote connection, keeping any cache connection.
    pub fn close(&mut self) {
        self.db.close();
    }
}

fn load_name_map(
    db: &mut CachingDb,
    query: &str,
) -> Result<(Vec<String>, BTreeMap<i64, String>)> {
    let mut names = Vec::new();
    let mut ids = BTreeMap::new();
    for row in db.query(query, &[], None)? {
        let id = row.first().and_then(Value::as_i64);
        let name = row.get(1).and_then(Value::as_str);
        if let (Some(id), Some(name)) = (id, name) {
            names.push(name.to_string());
            ids.insert(id, name.to_string());
        }
    }
    Ok((names, ids))
}

fn check_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
    if start >= end {
        return Err(LmtError::InvalidTimeRange { start, end });
    }
    Ok(())
}

fn stamp(t: NaiveDateTime) -> Value {
    t.format(DATE_FMT).to_string().into()
}

//! Retrieve a time window of an LMT database and cache it locally.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lmta_cachedb::RemoteCredentials;
use lmta_lmtdb::config::{ENV_DBNAME, ENV_HOST, ENV_PASSWORD, ENV_USER};
use lmta_lmtdb::{credentials_from_env, LmtDb, LmtError};

/// Timestamp format accepted on the command line.
const ARG_DATE_FMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Parser, Debug)]
#[command(
    name = "cache-lmtdb",
    about = "Retrieve a time window of an LMT database and cache it locally"
)]
struct Cli {
    /// Start of the window, in YYYY-MM-DDThh:mm:ss format
    start: String,

    /// End of the window (exclusive), in YYYY-MM-DDThh:mm:ss format
    end: String,

    /// Input cache database file; omit to use remote credentials
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Remote database host (overrides LMTDB_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Remote database user (overrides LMTDB_USER)
    #[arg(long)]
    user: Option<String>,

    /// Remote database password (overrides LMTDB_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Remote database name (overrides LMTDB_DB)
    #[arg(long)]
    database: Option<String>,

    /// Output cache database file (default: first free lmtdb-<n>.sqlite)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Restrict number of records returned per table
    #[arg(short, long)]
    limit: Option<u64>,
}

/// Remote credentials from the command line, with the `LMTDB_*`
/// environment variables filling in any flag not given.
fn remote_credentials(cli: &Cli) -> Option<RemoteCredentials> {
    if cli.host.is_none() && cli.user.is_none() && cli.password.is_none() && cli.database.is_none()
    {
        return credentials_from_env();
    }
    Some(RemoteCredentials {
        host: cli.host.clone().or_else(|| std::env::var(ENV_HOST).ok())?,
        user: cli.user.clone().or_else(|| std::env::var(ENV_USER).ok())?,
        password: cli
            .password
            .clone()
            .or_else(|| std::env::var(ENV_PASSWORD).ok())?,
        dbname: cli
            .database
            .clone()
            .or_else(|| std::env::var(ENV_DBNAME).ok())?,
    })
}

fn run(cli: Cli) -> Result<bool, LmtError> {
    let start = NaiveDateTime::parse_from_str(&cli.start, ARG_DATE_FMT)?;
    let end = NaiveDateTime::parse_from_str(&cli.end, ARG_DATE_FMT)?;

    let mut lmtdb = match &cli.input {
        Some(path) => LmtDb::from_cache_file(path)?,
        // Credentials alone are not enough: opening a remote source
        // takes a driver, and this binary does not link one in.
        None => match remote_credentials(&cli) {
            Some(_) => {
                eprintln!(
                    "error: no remote database driver is available; \
                     pass --input to read from a cache file"
                );
                std::process::exit(2);
            }
            None => {
                eprintln!(
                    "error: no --input cache file and no complete remote \
                     credentials (flags or LMTDB_* environment variables)"
                );
                std::process::exit(2);
            }
        },
    };

    let rows = lmtdb.archive_tables(start, end, cli.limit)?;

    let output = cli.output.unwrap_or_else(next_free_output);
    println!("Caching {rows} rows to {}", output.display());
    let report = lmtdb.persist(&output)?;
    for warning in &report.warnings {
        eprintln!(
            "warning: table {} not persisted: {}",
            warning.table, warning.error
        );
    }
    Ok(report.is_complete())
}

/// First `lmtdb-<n>.sqlite` that does not already exist.
fn next_free_output() -> PathBuf {
    let mut i = 0;
    loop {
        let candidate = PathBuf::from(format!("lmtdb-{i}.sqlite"));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

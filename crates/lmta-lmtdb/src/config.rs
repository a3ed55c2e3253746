//! Remote credential loading from the environment.

use lmta_cachedb::RemoteCredentials;

/// Environment variable naming the remote database host.
pub const ENV_HOST: &str = "LMTDB_HOST";
/// Environment variable naming the remote database user.
pub const ENV_USER: &str = "LMTDB_USER";
/// Environment variable holding the remote database password.
pub const ENV_PASSWORD: &str = "LMTDB_PASSWORD";
/// Environment variable naming the remote database.
pub const ENV_DBNAME: &str = "LMTDB_DB";

/// Build remote credentials from the environment.
///
/// Returns `None` unless all four variables are set; partial credentials
/// cannot open a connection and are treated as absent.
pub fn credentials_from_env() -> Option<RemoteCredentials> {
    Some(RemoteCredentials {
        host: std::env::var(ENV_HOST).ok()?,
        user: std::env::var(ENV_USER).ok()?,
        password: std::env::var(ENV_PASSWORD).ok()?,
        dbname: std::env::var(ENV_DBNAME).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-global, so the missing and present
    // cases run in one test.
    #[test]
    fn credentials_require_all_four_variables() {
        std::env::remove_var(ENV_HOST);
        std::env::remove_var(ENV_USER);
        std::env::remove_var(ENV_PASSWORD);
        std::env::remove_var(ENV_DBNAME);
        assert!(credentials_from_env().is_none());

        std::env::set_var(ENV_HOST, "db.example");
        std::env::set_var(ENV_USER, "reader");
        assert!(credentials_from_env().is_none());

        std::env::set_var(ENV_PASSWORD, "secret");
        std::env::set_var(ENV_DBNAME, "filesystem_snx11168");
        let creds = credentials_from_env().expect("complete credentials");
        assert_eq!(creds.host, "db.example");
        assert_eq!(creds.dbname, "filesystem_snx11168");

        std::env::remove_var(ENV_HOST);
        std::env::remove_var(ENV_USER);
        std::env::remove_var(ENV_PASSWORD);
        std::env::remove_var(ENV_DBNAME);
    }
}

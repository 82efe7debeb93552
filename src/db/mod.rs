//! Connection pool construction and request-scoped sessions.

pub mod base;
pub mod session;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};

use crate::config::Settings;

pub use session::DbSession;

/// Opens the connection pool for `settings.database_url`.
///
/// The database file (and its parent directory) is created when missing.
/// Every pooled connection has foreign keys enforced and a busy timeout so
/// concurrent writers wait instead of failing. SQL statements are only logged
/// when `debug` is on.
pub async fn connect(settings: &Settings) -> anyhow::Result<SqlitePool> {
    ensure_sqlite_parent_dir(&settings.database_url)?;

    let mut options = SqliteConnectOptions::from_str(&settings.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10));
    if !is_memory_url(&settings.database_url) {
        options = options.journal_mode(SqliteJournalMode::Wal).synchronous(SqliteSynchronous::Normal);
    }
    if !settings.debug {
        options = options.disable_statement_logging();
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.database_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
        .connect_with(options)
        .await?;

    // Fail at start-up rather than on the first request.
    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!(max_connections = settings.database_max_connections, "database pool ready");
    Ok(pool)
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Creates the parent directory of a file-backed SQLite URL. Other URLs are
/// left alone.
pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if is_memory_url(url) {
        return Ok(());
    }
    let Some(rest) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

//! Database connection and schema management.
//!
//! One SQLite file holds the canonical topics, imported scans with their
//! questions, and the question to topic links written by `map`. Every
//! connection enforces foreign keys and waits out short locks; file
//! databases run in WAL mode so `verify` can read while `map` writes.
//!
//! # Example
//!
//! ```no_run
//! use topicmap_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("topicmap.db")).await?;
//! // Hand db to a TopicStore...
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size for file databases. Import and map write in single
/// transactions, so more connections only add lock contention.
const MAX_CONNECTIONS: u32 = 4;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open or configure the database.
    #[error("failed to open database: {0}")]
    Connection(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool over the topicmap catalog: topics, scans, questions and links.
///
/// Built once at process start and cloned into whatever needs it; the pool
/// is reference counted.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Per-connection settings shared by file and in-memory databases.
///
/// Foreign keys must be on for every connection: link inserts rely on them
/// to reject unknown questions and topics, and deleting a scan relies on
/// them to cascade to its questions and links.
fn connect_options(base: SqliteConnectOptions) -> SqliteConnectOptions {
    base.foreign_keys(true).busy_timeout(BUSY_TIMEOUT)
}

impl Database {
    /// Opens (creating if needed) the database at `db_path` in WAL mode and
    /// runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the file cannot be opened,
    /// or `DbError::Migration` if migrations fail.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = connect_options(
            SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    /// Creates an in-memory database for tests.
    ///
    /// Single connection, so every query sees the same database.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let options = connect_options(SqliteConnectOptions::from_str("sqlite::memory:")?);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Catalog schema up to date");
        Ok(Self { pool })
    }

    /// Returns a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Reports whether the file is in WAL mode.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Reports whether foreign keys are enforced on a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    pub async fn foreign_keys_enabled(&self) -> Result<bool, DbError> {
        let (enabled,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&self.pool)
            .await?;
        Ok(enabled == 1)
    }

    /// Closes all connections in the pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

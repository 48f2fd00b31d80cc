//! # Database Pool Management
//!
//! Opens the SQLite store that every lending service shares.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shelf Store Handle                                 │
//! │                                                                         │
//! │  DbConfig::new("shelf.db")  or  DbConfig::in_memory()                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config) ──► pragmas ──► pool ──► embedded migrations    │
//! │       │                                                                 │
//! │       ├── begin()   ──► deferred transaction, one per lending operation │
//! │       └── acquire() ──► plain connection for one-off reads/writes      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshots and Conflicts
//! The store runs in WAL mode. A transaction reads from the snapshot taken
//! at its first read. If another writer commits in between, the first
//! write of the stale transaction fails with SQLITE_BUSY_SNAPSHOT, which
//! surfaces as [`DbError::Conflict`]. Waiting on a held write lock is
//! bounded by `busy_timeout`.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Store settings.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use shelf_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/shelf/shelf.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// assert_eq!(config.max_connections, 8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for a private store.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long to wait for a free pooled connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// How long a writer waits on a held write lock before SQLITE_BUSY.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private in-memory store for tests and throwaway runs.
    ///
    /// The database lives inside its only connection, so the pool holds
    /// exactly one and concurrent operations take turns.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared store handle. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and applies pending migrations.
    ///
    /// Every connection gets WAL journaling, NORMAL sync, foreign keys and
    /// the configured busy timeout.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.is_in_memory(),
            "Opening shelf store"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite; the schema relies on them
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        // The in-memory database dies with its connection, so keep it open
        let (min_connections, idle_timeout) = if config.is_in_memory() {
            (1, None)
        } else {
            (0, Some(Duration::from_secs(600)))
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(min_connections)
            .idle_timeout(idle_timeout)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Store pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a deferred transaction.
    ///
    /// Dropping it without `commit()` rolls back, so a cancelled caller
    /// never leaves a partial write behind.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    pub async fn close(&self) {
        info!("Closing shelf store");
        self.pool.close().await;
    }

    /// True when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and applied
//! by [`Database::new`](crate::Database::new) unless the config opts out.
//!
//! ```text
//!  001_initial_schema.sql   persons, copies, checkouts, holds, fines
//!                           + partial unique indexes for open checkouts
//!                             and pending holds
//! ```
//!
//! Applied versions are tracked by sqlx in `_sqlx_migrations`. Released
//! files are never edited; schema changes go in a new `NNN_name.sql`.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far a store is behind the embedded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
    /// Highest applied version, `None` on a fresh store.
    pub latest: Option<i64>,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }

    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Applies every embedded migration the store has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    for migration in MIGRATOR.iter() {
        debug!(version = migration.version, name = %migration.description, "Embedded migration");
    }

    MIGRATOR.run(pool).await?;

    info!(embedded = MIGRATOR.migrations.len(), "Shelf schema is current");
    Ok(())
}

/// Reports applied versus embedded migrations.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let (applied, latest) = if tracked == 0 {
        (0, None)
    } else {
        sqlx::query_as::<_, (i64, Option<i64>)>(
            "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(pool)
        .await?
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: applied as usize,
        latest,
    })
}

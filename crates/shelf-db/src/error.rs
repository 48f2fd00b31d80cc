//! # Store Errors
//!
//! `DbError` classifies what SQLite reported so the lending layer can tell a
//! lost race from a broken store.
//!
//! ```text
//!  sqlx::Error ──► DbError
//!                    ├── Conflict ─────────► LendingError::Conflict (retried)
//!                    ├── UniqueViolation ──► turned into a denial by the repository
//!                    └── anything else ────► LendingError::Store
//! ```

use thiserror::Error;

/// SQLite primary result codes for a write that lost a race.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Failure of a store call.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique index refused the row: a second open checkout for a copy,
    /// a second pending hold for one person and ISBN, or a second fine for
    /// one checkout.
    #[error("Unique constraint failed on {constraint}")]
    UniqueViolation { constraint: String },

    /// Usually a person or copy id that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The commit lost an optimistic-concurrency race.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_BUSY_SNAPSHOT: another writer committed after
    ///   this transaction took its read snapshot
    /// - SQLITE_LOCKED: shared-cache table lock
    ///
    /// Safe to retry the whole transaction.
    #[error("Commit conflict: {0}")]
    Conflict(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No pooled connection became free within `acquire_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for a lost commit race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

/// True when a SQLite extended result code is BUSY or LOCKED.
///
/// Extended codes carry the primary code in their low byte
/// (e.g. SQLITE_BUSY_SNAPSHOT = 517 = 5 | 2 << 8).
fn is_busy_or_locked(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// ```text
/// RowNotFound             → NotFound
/// Database, BUSY/LOCKED   → Conflict
/// Database, UNIQUE        → UniqueViolation
/// Database, FOREIGN KEY   → ForeignKeyViolation
/// Database, other         → QueryFailed
/// PoolTimedOut            → PoolExhausted
/// PoolClosed              → ConnectionFailed
/// anything else           → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_busy_or_locked(db_err.code().as_deref())
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Conflict(msg.to_string())
                } else if db_err.is_unique_violation() {
                    // "UNIQUE constraint failed: checkouts.copy_id"
                    let constraint = msg
                        .strip_prefix("UNIQUE constraint failed: ")
                        .unwrap_or(msg)
                        .to_string();
                    DbError::UniqueViolation { constraint }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("store has been closed".into()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

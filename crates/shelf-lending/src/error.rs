//! # Lending Error Types
//!
//! What callers of the lending services see.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Lending Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────┐  ┌─────────────────────┐ │
//! │  │  Domain             │  │  Conflict       │  │  Store              │ │
//! │  │                     │  │                 │  │                     │ │
//! │  │  NotFound           │  │  lost a commit  │  │  connection, pool,  │ │
//! │  │  PermissionDenied   │  │  race; retry    │  │  query failures     │ │
//! │  │  CheckoutDenied     │  │  the operation  │  │                     │ │
//! │  │  HoldDenied, ...    │  │                 │  │  transient, never   │ │
//! │  │  never retried      │  │  retryable      │  │  a domain denial    │ │
//! │  └─────────────────────┘  └─────────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use shelf_core::CoreError;
use shelf_db::DbError;

/// Result type alias for lending operations.
pub type LendingResult<T> = Result<T, LendingError>;

/// Error type for every lending service.
#[derive(Debug, Error)]
pub enum LendingError {
    /// A domain rule refused the request. Fix the request, don't retry.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The commit lost an optimistic-concurrency race.
    #[error("Concurrent update, retry the operation: {0}")]
    Conflict(String),

    /// Unexpected store failure.
    #[error("Store error: {0}")]
    Store(DbError),

    /// Failure outside the store (e.g. password hashing).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LendingError {
    /// True only for [`LendingError::Conflict`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, LendingError::Conflict(_))
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            LendingError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

/// Store conflicts become retryable; everything else stays a store error.
impl From<DbError> for LendingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => LendingError::Conflict(msg),
            other => LendingError::Store(other),
        }
    }
}

impl From<sqlx::Error> for LendingError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<shelf_core::ValidationError> for LendingError {
    fn from(err: shelf_core::ValidationError) -> Self {
        LendingError::Domain(err.into())
    }
}

impl From<shelf_core::IsbnError> for LendingError {
    fn from(err: shelf_core::IsbnError) -> Self {
        LendingError::Domain(err.into())
    }
}

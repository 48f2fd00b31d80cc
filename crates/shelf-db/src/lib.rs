//! # shelf-db: Database Layer for Shelf
//!
//! SQLite storage for copies, checkouts, holds, fines and persons.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelf Data Flow                                  │
//! │                                                                         │
//! │  shelf-lending (CirculationLedger, HoldQueue, Accounts)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     shelf-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ copies        │    │              │  │   │
//! │  │   │ SqlitePool    │    │ checkouts     │    │ 001_initial  │  │   │
//! │  │   │ Transactions  │◄───│ holds, fines  │    │ _schema.sql  │  │   │
//! │  │   │               │    │ persons       │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table query functions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelf_db::{Database, DbConfig};
//! use shelf_db::repository::copies;
//!
//! let db = Database::new(DbConfig::new("shelf.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let total = copies::count_by_isbn(&mut tx, &isbn).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{checkouts, copies, fines, holds, persons};

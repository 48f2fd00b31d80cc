//! # shelf-lending: Circulation Services for Shelf
//!
//! The services that own multi-table transactions: loans, holds and person
//! records.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lending Services                                 │
//! │                                                                         │
//! │  caller (resolved Principal, copy/person ids, ISBN text)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐   ┌──────────────┐   ┌──────────────┐            │
//! │  │ CirculationLedger│   │  HoldQueue   │   │   Accounts   │            │
//! │  │ open / close     │──►│ place/cancel │   │ add / patch  │            │
//! │  │ availability     │   │ rank, ready  │   │ argon2       │            │
//! │  └────────┬─────────┘   └──────┬───────┘   └──────┬───────┘            │
//! │           │ one transaction per operation          │                   │
//! │           ▼                    ▼                   ▼                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  shelf-db repositories (conditional inserts, partial indexes)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  busy / stale snapshot ──► LendingError::Conflict ──► retry_on_conflict│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`ledger`] - Checkouts, returns, fines, copies
//! - [`holds`] - FIFO reservation queue
//! - [`accounts`] - Person enrolment and updates
//! - [`config`] - TOML + environment configuration
//! - [`retry`] - Backoff for commit conflicts
//! - [`error`] - Lending error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelf_lending::{retry_on_conflict, LendingConfig, LendingServices};
//!
//! let config = LendingConfig::load_or_default(None);
//! let services = LendingServices::open(&config).await?;
//!
//! let checkout = retry_on_conflict(&services.retry, || {
//!     services.ledger.open_checkout(&copy_id, &person_id, None, None)
//! })
//! .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accounts;
pub mod config;
pub mod error;
pub mod holds;
pub mod ledger;
pub mod retry;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use accounts::{Accounts, NewPerson};
pub use config::{ConfigError, LendingConfig};
pub use error::{LendingError, LendingResult};
pub use holds::{HoldQueue, HoldStatus};
pub use ledger::CirculationLedger;
pub use retry::{retry_on_conflict, RetryPolicy};

use std::sync::Arc;

use shelf_core::{Clock, SystemClock};
use shelf_db::Database;
use tracing::info;

/// Every service wired to one pool and one clock.
#[derive(Clone)]
pub struct LendingServices {
    pub db: Database,
    pub ledger: CirculationLedger,
    pub holds: HoldQueue,
    pub accounts: Accounts,
    pub retry: RetryPolicy,
}

impl LendingServices {
    /// Opens the configured store (running migrations) on the system clock.
    pub async fn open(config: &LendingConfig) -> LendingResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Self::with_clock(db, Arc::new(SystemClock), config))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>, config: &LendingConfig) -> Self {
        info!(
            loan_days = config.loans.default_length_days,
            penalty_cents = config.loans.default_penalty_cents,
            "Lending services ready"
        );

        LendingServices {
            ledger: CirculationLedger::new(db.clone(), clock.clone()).with_loan_settings(&config.loans),
            holds: HoldQueue::new(db.clone(), clock.clone()),
            accounts: Accounts::new(db.clone(), clock),
            retry: config.retry_policy(),
            db,
        }
    }
}

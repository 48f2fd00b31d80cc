//! # shelf-core: Pure Domain Logic for Shelf
//!
//! This crate holds everything about lending that can be decided without
//! touching a database: the ISBN codec, fine arithmetic, record types and
//! the rules for who may change what.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelf Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    shelf-lending (services)                     │   │
//! │  │   CirculationLedger ──► HoldQueue ──► Accounts                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shelf-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   isbn    │  │   fine    │  │   types   │  │ validation│  │   │
//! │  │   │  parse    │  │  assess   │  │  Person   │  │  patches  │  │   │
//! │  │   │  regions  │  │  Money    │  │  Checkout │  │  limits   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    shelf-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`isbn`] - ISBN-10/13 parsing, checksums, segmentation, region lookup
//! - [`fine`] - Overdue fine assessment
//! - [`money`] - Integer-cent money
//! - [`types`] - Person, BookCopy, Checkout, Hold, Fine, capabilities
//! - [`clock`] - Injectable time source
//! - [`validation`] - Input checks and person-update rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shelf_core::isbn::{Isbn, Region};
//!
//! let isbn: Isbn = "978-0-553-21350-8".parse().unwrap();
//! assert_eq!(isbn.group(), "0");
//! assert_eq!(isbn.region().unwrap(), Region::EnglishSpeaking);
//! assert_eq!(isbn.to_string(), "9780553213508");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod fine;
pub mod isbn;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CheckoutDenial, CoreError, CoreResult, HoldDenial, IsbnError, ValidationError};
pub use isbn::{Isbn, Region};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Loan length used when the caller does not ask for one.
pub const DEFAULT_LOAN_DAYS: u32 = 7;

/// Penalty per overdue day when the caller does not set one (1.00).
pub const DEFAULT_PENALTY_CENTS: i64 = 100;

/// Longest loan anyone can ask for (ten years).
pub const MAX_LOAN_DAYS: u32 = 3_650;

/// Highest per-day penalty (10 000.00).
pub const MAX_PENALTY_CENTS: i64 = 1_000_000;

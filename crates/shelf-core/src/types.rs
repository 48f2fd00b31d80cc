//! # Domain Types
//!
//! Flat records shared by every shelf crate.
//!
//! ## Record Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Records                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Person      │   │    BookCopy     │   │    Checkout     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  copy_id (FK)   │       │
//! │  │  permissions    │   │  isbn           │   │  person_id (FK) │       │
//! │  │  limits         │   └─────────────────┘   │  start/due/end  │       │
//! │  └─────────────────┘                         │  penalty_rate   │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │      Hold       │   │      Fine       │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  person_id (FK) │   │  checkout_id    │                             │
//! │  │  isbn           │   │  amount         │                             │
//! │  │  placed_at      │   │  completed      │                             │
//! │  │  resolution     │   └─────────────────┘                             │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no Item/Book or User/Person hierarchy: a `Person` optionally
//! carries capabilities and limits, a `BookCopy` just points at an ISBN.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::isbn::Isbn;
use crate::money::Money;

// =============================================================================
// Capabilities
// =============================================================================

/// A single permission token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May open checkouts and place holds for themselves.
    Borrow,
    /// May cancel anyone's holds.
    ManageHolds,
    /// May edit other people's records (but not permissions).
    ManageUsers,
    /// Satisfies every capability check.
    Admin,
}

impl Capability {
    /// The stored token for this capability.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::Borrow => "borrow",
            Capability::ManageHolds => "manage_holds",
            Capability::ManageUsers => "manage_users",
            Capability::Admin => "admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrow" => Ok(Capability::Borrow),
            "manage_holds" => Ok(Capability::ManageHolds),
            "manage_users" => Ok(Capability::ManageUsers),
            "admin" => Ok(Capability::Admin),
            other => Err(ValidationError::InvalidFormat {
                field: "permissions".to_string(),
                reason: format!("unknown capability '{}'", other),
            }),
        }
    }
}

/// The set of capabilities a person holds.
///
/// Serialized as a JSON array of tokens, e.g. `["borrow","manage_holds"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// An empty set.
    pub fn new() -> Self {
        CapabilitySet(BTreeSet::new())
    }

    /// True when the set grants `capability`, either directly or via admin.
    pub fn allows(&self, capability: Capability) -> bool {
        self.0.contains(&Capability::Admin) || self.0.contains(&capability)
    }

    /// True only for the literal admin token.
    pub fn is_admin(&self) -> bool {
        self.0.contains(&Capability::Admin)
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    pub fn remove(&mut self, capability: Capability) -> bool {
        self.0.remove(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

// =============================================================================
// Person / Principal
// =============================================================================

/// Per-person borrowing limits. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Limits {
    /// Maximum number of concurrently open checkouts.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "limit_books"))]
    pub books: Option<u32>,

    /// Maximum loan length in days.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "limit_days"))]
    pub days: Option<u32>,
}

/// A library patron or staff member.
///
/// The password hash lives only in the store and never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Person {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    pub email: Option<String>,

    /// Capability tokens, stored as JSON text.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub permissions: CapabilitySet,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub limits: Limits,

    pub created_at: DateTime<Utc>,
}

impl Person {
    /// The acting identity this person resolves to.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            permissions: self.permissions.clone(),
            limits: self.limits,
        }
    }
}

/// A resolved acting party: who, what they may do, and their limits.
///
/// Supplied by whatever authenticated the caller; the lending services only
/// consume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub permissions: CapabilitySet,
    #[serde(default)]
    pub limits: Limits,
}

impl Principal {
    /// True when this principal holds `capability` (admin satisfies all).
    pub fn can(&self, capability: Capability) -> bool {
        self.permissions.allows(capability)
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.is_admin()
    }
}

// =============================================================================
// Copy
// =============================================================================

/// One physical copy of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BookCopy {
    pub id: String,

    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub isbn: Isbn,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Checkout
// =============================================================================

/// A loan of one copy to one person.
///
/// Created open (`completed = false`, `end_at = None`) and closed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Checkout {
    pub id: String,
    pub copy_id: String,
    pub person_id: String,
    pub start_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub completed: bool,

    /// Penalty per overdue day.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "penalty_rate_cents"))]
    pub penalty_rate: Money,
}

impl Checkout {
    /// Builds a new open checkout starting at `now`.
    ///
    /// A due date past the end of the calendar is pinned to the latest
    /// representable instant; validated terms never get there.
    pub fn open(copy_id: &str, person_id: &str, terms: LoanTerms, now: DateTime<Utc>) -> Self {
        let due_at = now
            .checked_add_signed(Duration::days(i64::from(terms.length_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Checkout {
            id: uuid::Uuid::new_v4().to_string(),
            copy_id: copy_id.to_string(),
            person_id: person_id.to_string(),
            start_at: now,
            due_at,
            end_at: None,
            completed: false,
            penalty_rate: terms.penalty_rate,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.completed
    }

    /// Marks the loan returned at `now`.
    pub fn close(&mut self, now: DateTime<Utc>) {
        self.end_at = Some(now);
        self.completed = true;
    }
}

/// Resolved length and rate for a new loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    pub length_days: u32,
    pub penalty_rate: Money,
}

impl LoanTerms {
    /// Resolves the terms for a loan.
    ///
    /// The length is the requested value (or `default_days`) capped by the
    /// person's day limit. The rate is the requested one or `default_rate`.
    ///
    /// ## Example
    /// ```rust
    /// use shelf_core::money::Money;
    /// use shelf_core::types::{Limits, LoanTerms};
    ///
    /// let limits = Limits { books: None, days: Some(14) };
    /// let terms = LoanTerms::resolve(Some(21), None, &limits, 7, Money::from_cents(100));
    /// assert_eq!(terms.length_days, 14);
    /// assert_eq!(terms.penalty_rate.cents(), 100);
    /// ```
    pub fn resolve(
        requested_days: Option<u32>,
        requested_rate: Option<Money>,
        limits: &Limits,
        default_days: u32,
        default_rate: Money,
    ) -> Self {
        let wanted = requested_days.unwrap_or(default_days);
        let length_days = match limits.days {
            Some(cap) => wanted.min(cap),
            None => wanted,
        };

        LoanTerms {
            length_days,
            penalty_rate: requested_rate.unwrap_or(default_rate),
        }
    }
}

// =============================================================================
// Hold
// =============================================================================

/// How a hold stopped being pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum HoldResolution {
    /// Consumed by the holder checking out a copy.
    Fulfilled,
    /// Withdrawn by the holder or a hold manager.
    Cancelled,
}

/// A reservation by a person for the next available copy of an ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Hold {
    pub id: String,
    pub person_id: String,

    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub isbn: Isbn,

    /// Queue order key. Ties fall back to insertion order.
    pub placed_at: DateTime<Utc>,

    pub completed: bool,
    pub resolution: Option<HoldResolution>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Hold {
    /// A new pending hold placed at `now`.
    pub fn new(person_id: &str, isbn: Isbn, now: DateTime<Utc>) -> Self {
        Hold {
            id: uuid::Uuid::new_v4().to_string(),
            person_id: person_id.to_string(),
            isbn,
            placed_at: now,
            completed: false,
            resolution: None,
            completed_at: None,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        !self.completed
    }
}

// =============================================================================
// Fine
// =============================================================================

/// A penalty for one overdue checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Fine {
    pub id: String,
    pub checkout_id: String,
    pub copy_id: String,
    pub person_id: String,
    pub assessed_at: DateTime<Utc>,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "amount_cents"))]
    pub amount: Money,

    /// Set by a separate payment action.
    pub completed: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

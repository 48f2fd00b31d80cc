//! # Fine Assessment
//!
//! Pure computation of the penalty owed for a closed loan.
//!
//! ```text
//!   start            due                end
//!     │───── loan ─────│──── overdue ─────│
//!                      └─ ceil(days) × rate ─┘
//! ```
//!
//! A loan returned any time after `due_at` owes at least one day; a partial
//! day counts as a whole one.

use chrono::{DateTime, Utc};

use crate::money::Money;
use crate::types::{Checkout, Fine};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days late, rounded up. Zero when returned on or before `due`.
pub fn overdue_days(due: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let late_ms = (end - due).num_milliseconds();
    if late_ms <= 0 {
        return 0;
    }
    (late_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Assesses a fine for a closed checkout.
///
/// Returns `None` if the checkout is still open or was returned on time.
/// The amount is exact: the rate is whole cents per day.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use shelf_core::fine::assess;
/// use shelf_core::money::Money;
/// use shelf_core::types::{Checkout, LoanTerms};
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
/// let terms = LoanTerms { length_days: 7, penalty_rate: Money::from_cents(100) };
/// let mut checkout = Checkout::open("copy-1", "person-1", terms, start);
///
/// let returned = checkout.due_at + Duration::days(10);
/// checkout.close(returned);
///
/// let fine = assess(&checkout, returned).unwrap();
/// assert_eq!(fine.amount, Money::from_cents(1000));
/// ```
pub fn assess(checkout: &Checkout, now: DateTime<Utc>) -> Option<Fine> {
    let end = checkout.end_at?;
    if end <= checkout.due_at {
        return None;
    }

    let days = overdue_days(checkout.due_at, end);
    let amount: Money = checkout.penalty_rate.times(days);

    Some(Fine {
        id: uuid::Uuid::new_v4().to_string(),
        checkout_id: checkout.id.clone(),
        copy_id: checkout.copy_id.clone(),
        person_id: checkout.person_id.clone(),
        assessed_at: now,
        amount,
        completed: false,
    })
}

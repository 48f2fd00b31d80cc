//! # Hold Queue
//!
//! Reservations for the next free copy of an ISBN.
//!
//! ## FIFO Readiness
//! ```text
//!   pending holds for 978-0-553-21350-8, ordered by placed_at then insertion
//!
//!   position:   0          1          2
//!             ┌─────┐    ┌─────┐    ┌─────┐
//!             │  A  │ ── │  B  │ ── │  C  │
//!             └─────┘    └─────┘    └─────┘
//!                ▲
//!   ready iff a copy is free AND the hold is at position 0.
//!   B and C wait even when several copies are free.
//! ```
//!
//! Readiness is a snapshot read. Callers re-check through
//! [`CirculationLedger::open_checkout`](crate::CirculationLedger::open_checkout)
//! before acting on it.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use shelf_core::{Capability, Clock, CoreError, Hold, HoldDenial, HoldResolution, Isbn, Principal};
use shelf_db::{checkouts, holds, persons, Database};

use crate::error::LendingResult;
use crate::ledger::available_copies;

/// A pending hold with its place in line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldStatus {
    pub hold: Hold,
    /// Zero-based FIFO rank.
    pub position: usize,
    pub ready: bool,
}

/// Reservation queue service.
#[derive(Clone)]
pub struct HoldQueue {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl HoldQueue {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        HoldQueue { db, clock }
    }

    /// Puts `person_id` in line for `isbn`.
    ///
    /// ## Errors
    /// * `NotFound` - no such person
    /// * `HoldDenied::AlreadyCheckedOut` - the person has a copy out now
    /// * `HoldDenied::AlreadyOnHold` - the person is already in line
    pub async fn place(&self, isbn: &Isbn, person_id: &str) -> LendingResult<Hold> {
        let mut tx = self.db.begin().await?;

        if persons::get(&mut tx, person_id).await?.is_none() {
            return Err(CoreError::not_found("Person", person_id).into());
        }

        if checkouts::person_has_open_for_isbn(&mut tx, person_id, isbn).await? {
            return Err(CoreError::from(HoldDenial::AlreadyCheckedOut {
                person_id: person_id.to_string(),
                isbn: isbn.to_string(),
            })
            .into());
        }

        let hold = Hold::new(person_id, isbn.clone(), self.clock.now());

        // Covers both the snapshot check and the unique index
        if !holds::insert_if_absent(&mut tx, &hold).await? {
            return Err(already_on_hold(person_id, isbn));
        }

        tx.commit().await?;

        info!(hold_id = %hold.id, person_id = %person_id, isbn = %isbn, "Hold placed");
        Ok(hold)
    }

    /// Withdraws a pending hold.
    ///
    /// The owner may always cancel; anyone else needs `manage_holds`.
    pub async fn cancel(&self, hold_id: &str, requester: &Principal) -> LendingResult<Hold> {
        let mut tx = self.db.begin().await?;

        let mut hold = holds::get(&mut tx, hold_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Hold", hold_id))?;

        if hold.person_id != requester.id && !requester.can(Capability::ManageHolds) {
            return Err(CoreError::permission_denied(
                "cancelling another person's hold requires manage_holds",
            )
            .into());
        }

        let now = self.clock.now();
        if !hold.is_pending() || !holds::resolve(&mut tx, hold_id, HoldResolution::Cancelled, now).await? {
            return Err(CoreError::not_found("Pending hold", hold_id).into());
        }

        tx.commit().await?;

        hold.completed = true;
        hold.resolution = Some(HoldResolution::Cancelled);
        hold.completed_at = Some(now);

        info!(
            hold_id = %hold_id,
            person_id = %hold.person_id,
            cancelled_by = %requester.id,
            "Hold cancelled"
        );
        Ok(hold)
    }

    /// Zero-based rank of the person's pending hold, or `None`.
    pub async fn position_for(&self, isbn: &Isbn, person_id: &str) -> LendingResult<Option<usize>> {
        let mut conn = self.db.acquire().await?;
        Ok(holds::position_of(&mut conn, isbn, person_id).await?)
    }

    /// True iff a copy is free and `hold` is first in line for its ISBN.
    pub async fn is_ready(&self, hold: &Hold) -> LendingResult<bool> {
        let status = self.status_of(hold).await?;
        debug!(hold_id = %hold.id, ?status, "Readiness");

        Ok(matches!(status, Some((_, true))))
    }

    /// The person's pending holds, oldest first, each with its rank and
    /// readiness.
    pub async fn holds_for_person(&self, person_id: &str) -> LendingResult<Vec<HoldStatus>> {
        let pending = {
            let mut conn = self.db.acquire().await?;
            holds::list_pending_by_person(&mut conn, person_id).await?
        };

        // Each lookup takes its own connection; the listing one is released
        let statuses = try_join_all(pending.iter().map(|hold| self.status_of(hold))).await?;

        Ok(pending
            .into_iter()
            .zip(statuses)
            .filter_map(|(hold, status)| {
                status.map(|(position, ready)| HoldStatus { hold, position, ready })
            })
            .collect())
    }

    /// Rank and readiness from one snapshot; `None` once the hold is no
    /// longer pending.
    async fn status_of(&self, hold: &Hold) -> LendingResult<Option<(usize, bool)>> {
        let mut tx = self.db.begin().await?;

        let queue = holds::list_pending_by_isbn(&mut tx, &hold.isbn).await?;
        let status = match queue.iter().position(|h| h.id == hold.id) {
            Some(position) => {
                let ready = position == 0 && available_copies(&mut tx, &hold.isbn).await? > 0;
                Some((position, ready))
            }
            None => None,
        };

        tx.commit().await?;
        Ok(status)
    }
}

fn already_on_hold(person_id: &str, isbn: &Isbn) -> crate::error::LendingError {
    CoreError::from(HoldDenial::AlreadyOnHold {
        person_id: person_id.to_string(),
        isbn: isbn.to_string(),
    })
    .into()
}

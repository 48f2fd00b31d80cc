//! # Circulation Ledger
//!
//! Owns the checkout lifecycle: shelving copies, opening and closing loans,
//! and assessing fines on late returns.
//!
//! ## Open Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     open_checkout (one transaction)                     │
//! │                                                                         │
//! │  validate inputs ──► copy exists? ──────────────► NotFound              │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                      copy free? ────────────────► AlreadyOut            │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                      person exists? ────────────► NotFound              │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                      may borrow? ───────────────► PermissionDenied      │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                      under book limit? ─────────► LimitReached          │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  INSERT … WHERE NOT EXISTS (open checkout) ─────► AlreadyOut            │
//! │  consume pending hold for (person, isbn)                                │
//! │  COMMIT ──────────────────────────── busy/stale ► Conflict (retryable)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping the returned future before `COMMIT` rolls the transaction back.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use shelf_core::validation::{validate_loan_length, validate_penalty_rate};
use shelf_core::{
    fine, BookCopy, Capability, Checkout, CheckoutDenial, Clock, CoreError, Fine,
    HoldResolution, Isbn, LoanTerms, Money, DEFAULT_LOAN_DAYS, DEFAULT_PENALTY_CENTS,
};
use shelf_db::{checkouts, copies, fines, holds, persons, Database, DbResult};

use crate::config::LoanSettings;
use crate::error::LendingResult;

/// Checkout lifecycle service.
///
/// Cheap to clone; clones share the pool and the clock.
#[derive(Clone)]
pub struct CirculationLedger {
    db: Database,
    clock: Arc<dyn Clock>,
    default_length_days: u32,
    default_penalty_rate: Money,
}

impl CirculationLedger {
    /// Creates a ledger with 7-day loans at 1.00 per overdue day.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        CirculationLedger {
            db,
            clock,
            default_length_days: DEFAULT_LOAN_DAYS,
            default_penalty_rate: Money::from_cents(DEFAULT_PENALTY_CENTS),
        }
    }

    /// Replaces the loan defaults.
    pub fn with_loan_settings(mut self, loans: &LoanSettings) -> Self {
        self.default_length_days = loans.default_length_days;
        self.default_penalty_rate = loans.default_penalty_rate();
        self
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Shelves a new copy of `isbn`.
    pub async fn add_copy(&self, isbn: &Isbn) -> LendingResult<BookCopy> {
        let copy = BookCopy {
            id: copies::generate_copy_id(),
            isbn: isbn.clone(),
            created_at: self.clock.now(),
        };

        let mut conn = self.db.acquire().await?;
        copies::insert(&mut conn, &copy).await?;

        info!(copy_id = %copy.id, isbn = %copy.isbn, "Copy shelved");
        Ok(copy)
    }

    /// Every copy of `isbn`, oldest first.
    pub async fn copies_of(&self, isbn: &Isbn) -> LendingResult<Vec<BookCopy>> {
        let mut conn = self.db.acquire().await?;
        Ok(copies::list_by_isbn(&mut conn, isbn).await?)
    }

    /// Copies of `isbn` not currently on loan. Never negative.
    pub async fn availability(&self, isbn: &Isbn) -> LendingResult<u32> {
        // One transaction so both counts come from the same snapshot
        let mut tx = self.db.begin().await?;
        let available = available_copies(&mut tx, isbn).await?;
        tx.commit().await?;

        Ok(available)
    }

    // =========================================================================
    // Checkouts
    // =========================================================================

    /// Lends `copy_id` to `person_id`.
    ///
    /// `requested_days` defaults to the configured loan length and is capped
    /// by the person's day limit; it must lie in `1..=MAX_LOAN_DAYS`.
    /// `penalty_rate` is charged per overdue day in whole cents, up to
    /// `MAX_PENALTY_CENTS`. Sub-cent rates such as 0.125/day are not
    /// representable, so a fine is always an exact two-decimal amount and
    /// needs no rounding. A pending hold the person has on this ISBN is
    /// consumed in the same commit.
    pub async fn open_checkout(
        &self,
        copy_id: &str,
        person_id: &str,
        requested_days: Option<u32>,
        penalty_rate: Option<Money>,
    ) -> LendingResult<Checkout> {
        if let Some(days) = requested_days {
            validate_loan_length(days)?;
        }
        if let Some(rate) = penalty_rate {
            validate_penalty_rate(rate)?;
        }

        let mut tx = self.db.begin().await?;

        let copy = copies::get(&mut tx, copy_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Copy", copy_id))?;

        if checkouts::find_open_by_copy(&mut tx, copy_id).await?.is_some() {
            return Err(already_out(copy_id));
        }

        let person = persons::get(&mut tx, person_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Person", person_id))?;

        if !person.principal().can(Capability::Borrow) {
            return Err(CoreError::permission_denied(format!(
                "person {} may not borrow",
                person_id
            ))
            .into());
        }

        if let Some(limit) = person.limits.books {
            let open = checkouts::count_open_by_person(&mut tx, person_id).await?;
            if open >= i64::from(limit) {
                return Err(CoreError::from(CheckoutDenial::LimitReached {
                    person_id: person_id.to_string(),
                    limit,
                })
                .into());
            }
        }

        let now = self.clock.now();
        let terms = LoanTerms::resolve(
            requested_days,
            penalty_rate,
            &person.limits,
            self.default_length_days,
            self.default_penalty_rate,
        );
        // Also covers defaults from hand-built LoanSettings
        validate_loan_length(terms.length_days)?;
        validate_penalty_rate(terms.penalty_rate)?;

        let checkout = Checkout::open(copy_id, person_id, terms, now);

        if !checkouts::insert_if_copy_free(&mut tx, &checkout).await? {
            return Err(already_out(copy_id));
        }

        let consumed = match holds::find_pending(&mut tx, person_id, &copy.isbn).await? {
            Some(hold) => {
                holds::resolve(&mut tx, &hold.id, HoldResolution::Fulfilled, now).await?;
                Some(hold.id)
            }
            None => None,
        };

        tx.commit().await?;

        info!(
            checkout_id = %checkout.id,
            copy_id = %copy_id,
            person_id = %person_id,
            isbn = %copy.isbn,
            due_at = %checkout.due_at,
            hold_consumed = ?consumed,
            "Checkout opened"
        );

        Ok(checkout)
    }

    /// Returns `copy_id`, assessing a fine if the loan ran past due.
    pub async fn close_checkout(&self, copy_id: &str) -> LendingResult<Option<Fine>> {
        let mut tx = self.db.begin().await?;

        let mut checkout = checkouts::find_open_by_copy(&mut tx, copy_id)
            .await?
            .ok_or_else(|| not_checked_out(copy_id))?;

        let now = self.clock.now();
        if !checkouts::close(&mut tx, &checkout.id, now).await? {
            return Err(not_checked_out(copy_id));
        }
        checkout.close(now);

        let fine = fine::assess(&checkout, now);
        if let Some(fine) = &fine {
            fines::insert(&mut tx, fine).await?;
        }

        tx.commit().await?;

        match &fine {
            Some(fine) => info!(
                checkout_id = %checkout.id,
                copy_id = %copy_id,
                person_id = %checkout.person_id,
                amount = %fine.amount,
                "Checkout closed late, fine assessed"
            ),
            None => info!(
                checkout_id = %checkout.id,
                copy_id = %copy_id,
                person_id = %checkout.person_id,
                "Checkout closed"
            ),
        }

        Ok(fine)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// A person's open checkouts, earliest due first.
    pub async fn open_checkouts_for(&self, person_id: &str) -> LendingResult<Vec<Checkout>> {
        let mut conn = self.db.acquire().await?;
        Ok(checkouts::list_open_by_person(&mut conn, person_id).await?)
    }

    /// Every loan of a copy, most recent first.
    pub async fn checkout_history(&self, copy_id: &str) -> LendingResult<Vec<Checkout>> {
        let mut conn = self.db.acquire().await?;
        Ok(checkouts::list_by_copy(&mut conn, copy_id).await?)
    }

    pub async fn fines_for(&self, person_id: &str) -> LendingResult<Vec<Fine>> {
        let mut conn = self.db.acquire().await?;
        Ok(fines::list_by_person(&mut conn, person_id).await?)
    }
}

/// Copies of `isbn` minus its open checkouts, clamped at zero.
pub(crate) async fn available_copies(conn: &mut SqliteConnection, isbn: &Isbn) -> DbResult<u32> {
    let total = copies::count_by_isbn(conn, isbn).await?;
    let out = checkouts::count_open_by_isbn(conn, isbn).await?;
    let available = (total - out).max(0);

    debug!(isbn = %isbn, total, out, available, "Availability");
    Ok(u32::try_from(available).unwrap_or(u32::MAX))
}

fn already_out(copy_id: &str) -> crate::error::LendingError {
    CoreError::from(CheckoutDenial::AlreadyOut {
        copy_id: copy_id.to_string(),
    })
    .into()
}

fn not_checked_out(copy_id: &str) -> crate::error::LendingError {
    CoreError::NotCheckedOut {
        copy_id: copy_id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LendingError;
    use crate::retry::{retry_on_conflict, RetryPolicy};
    use crate::testing::{t0, Fixture, ISBN_A};
    use chrono::Duration;
    use shelf_core::{Limits, ManualClock, ValidationError, MAX_LOAN_DAYS, MAX_PENALTY_CENTS};
    use shelf_db::DbConfig;

    fn denial(result: LendingResult<impl std::fmt::Debug>) -> CoreError {
        match result {
            Err(LendingError::Domain(err)) => err,
            other => panic!("expected a domain error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_availability_counts_free_copies() {
        let fx = Fixture::new().await;
        let isbn = Isbn::parse(ISBN_A).unwrap();
        let ledger = fx.ledger();

        assert_eq!(ledger.availability(&isbn).await.unwrap(), 0);

        fx.copy("c1", ISBN_A).await;
        fx.copy("c2", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        assert_eq!(ledger.availability(&isbn).await.unwrap(), 2);

        ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        assert_eq!(ledger.availability(&isbn).await.unwrap(), 1);

        ledger.close_checkout("c1").await.unwrap();
        assert_eq!(ledger.availability(&isbn).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_default_terms_and_day_limit() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.copy("c2", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        fx.person("p2", &[Capability::Borrow], Limits { books: None, days: Some(3) }).await;
        let ledger = fx.ledger();

        let loan = ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        assert_eq!(loan.start_at, t0());
        assert_eq!(loan.due_at, t0() + Duration::days(7));
        assert_eq!(loan.penalty_rate, Money::from_cents(100));
        assert!(loan.is_open());

        let capped = ledger
            .open_checkout("c2", "p2", Some(10), Some(Money::from_cents(25)))
            .await
            .unwrap();
        assert_eq!(capped.due_at, t0() + Duration::days(3));
        assert_eq!(capped.penalty_rate, Money::from_cents(25));
    }

    #[tokio::test]
    async fn test_loan_length_and_rate_are_bounded() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        let ledger = fx.ledger();

        let result = ledger.open_checkout("c1", "p1", Some(u32::MAX), None).await;
        assert!(matches!(
            result,
            Err(LendingError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. })))
        ));

        let result = ledger
            .open_checkout("c1", "p1", None, Some(Money::from_cents(i64::MAX / 2)))
            .await;
        assert!(matches!(
            result,
            Err(LendingError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. })))
        ));
        assert_eq!(ledger.availability(&Isbn::parse(ISBN_A).unwrap()).await.unwrap(), 1);

        let longest = ledger
            .open_checkout("c1", "p1", Some(MAX_LOAN_DAYS), Some(Money::from_cents(MAX_PENALTY_CENTS)))
            .await
            .unwrap();
        assert_eq!(longest.due_at, t0() + Duration::days(i64::from(MAX_LOAN_DAYS)));

        // Back a century late at the top rate: large but exact
        fx.clock.set(longest.due_at + Duration::days(36_500));
        let fine = ledger.close_checkout("c1").await.unwrap().unwrap();
        assert_eq!(fine.amount, Money::from_cents(MAX_PENALTY_CENTS * 36_500));
    }

    #[tokio::test]
    async fn test_oversized_stored_rate_saturates_instead_of_panicking() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;

        // A row written outside the ledger, bypassing rate validation
        let terms = LoanTerms { length_days: 7, penalty_rate: Money::from_cents(i64::MAX / 2) };
        let loan = Checkout::open("c1", "p1", terms, t0());
        let mut conn = fx.db.acquire().await.unwrap();
        assert!(checkouts::insert_if_copy_free(&mut conn, &loan).await.unwrap());
        drop(conn);

        fx.clock.set(loan.due_at + Duration::days(3));
        let fine = fx.ledger().close_checkout("c1").await.unwrap().unwrap();
        assert_eq!(fine.amount, Money::from_cents(i64::MAX));
        assert!(fx.ledger().open_checkouts_for("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_late_return_assesses_fine() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        let ledger = fx.ledger();

        let loan = ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        fx.clock.set(loan.due_at + Duration::days(10));

        let fine = ledger.close_checkout("c1").await.unwrap().unwrap();
        assert_eq!(fine.amount.to_string(), "10.00");
        assert_eq!(fine.checkout_id, loan.id);
        assert_eq!(fine.copy_id, "c1");
        assert_eq!(fine.person_id, "p1");
        assert!(!fine.completed);

        let mut conn = fx.db.acquire().await.unwrap();
        let linked = fines::find_by_checkout(&mut conn, &loan.id).await.unwrap();
        assert_eq!(linked.as_ref(), Some(&fine));
        drop(conn);

        let stored = ledger.fines_for("p1").await.unwrap();
        assert_eq!(stored, vec![fine]);

        let history = ledger.checkout_history("c1").await.unwrap();
        assert!(history[0].completed);
        assert_eq!(history[0].end_at, Some(loan.due_at + Duration::days(10)));
    }

    #[tokio::test]
    async fn test_on_time_return_has_no_fine() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        let ledger = fx.ledger();

        ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        fx.clock.advance(Duration::days(7));

        assert!(ledger.close_checkout("c1").await.unwrap().is_none());
        assert!(ledger.fines_for("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_requires_open_checkout() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        let ledger = fx.ledger();

        assert!(matches!(
            denial(ledger.close_checkout("c1").await),
            CoreError::NotCheckedOut { .. }
        ));

        ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        ledger.close_checkout("c1").await.unwrap();
        assert!(matches!(
            denial(ledger.close_checkout("c1").await),
            CoreError::NotCheckedOut { .. }
        ));
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.copy("c2", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        fx.person("viewer", &[Capability::ManageHolds], Limits::default()).await;
        let ledger = fx.ledger();

        assert!(matches!(
            denial(ledger.open_checkout("missing", "p1", None, None).await),
            CoreError::NotFound { .. }
        ));

        ledger.open_checkout("c1", "p1", None, None).await.unwrap();

        // A copy that is out wins over a person that does not exist
        assert!(matches!(
            denial(ledger.open_checkout("c1", "ghost", None, None).await),
            CoreError::CheckoutDenied(CheckoutDenial::AlreadyOut { .. })
        ));
        assert!(matches!(
            denial(ledger.open_checkout("c2", "ghost", None, None).await),
            CoreError::NotFound { .. }
        ));
        assert!(matches!(
            denial(ledger.open_checkout("c2", "viewer", None, None).await),
            CoreError::PermissionDenied { .. }
        ));
        assert!(matches!(
            denial(ledger.open_checkout("c2", "p1", Some(0), None).await),
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[tokio::test]
    async fn test_admin_may_borrow() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("root", &[Capability::Admin], Limits::default()).await;

        assert!(fx.ledger().open_checkout("c1", "root", None, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_book_limit() {
        let fx = Fixture::new().await;
        for id in ["c1", "c2", "c3"] {
            fx.copy(id, ISBN_A).await;
        }
        fx.person("p1", &[Capability::Borrow], Limits { books: Some(2), days: None }).await;
        let ledger = fx.ledger();

        ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        ledger.open_checkout("c2", "p1", None, None).await.unwrap();

        let err = denial(ledger.open_checkout("c3", "p1", None, None).await);
        assert_eq!(
            err,
            CoreError::from(CheckoutDenial::LimitReached {
                person_id: "p1".to_string(),
                limit: 2,
            })
        );

        ledger.close_checkout("c1").await.unwrap();
        assert!(ledger.open_checkout("c3", "p1", None, None).await.is_ok());
        assert_eq!(ledger.open_checkouts_for("p1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_consumes_pending_hold() {
        let fx = Fixture::new().await;
        let isbn = Isbn::parse(ISBN_A).unwrap();
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        let queue = fx.holds();

        let hold = queue.place(&isbn, "p1").await.unwrap();
        fx.ledger().open_checkout("c1", "p1", None, None).await.unwrap();

        assert_eq!(queue.position_for(&isbn, "p1").await.unwrap(), None);

        let mut conn = fx.db.acquire().await.unwrap();
        let stored = holds::get(&mut conn, &hold.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.resolution, Some(HoldResolution::Fulfilled));
        assert_eq!(stored.completed_at, Some(t0()));
    }

    #[tokio::test]
    async fn test_failed_checkout_leaves_hold_pending() {
        let fx = Fixture::new().await;
        let isbn = Isbn::parse(ISBN_A).unwrap();
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        fx.person("p2", &[Capability::Borrow], Limits::default()).await;
        let ledger = fx.ledger();
        let queue = fx.holds();

        ledger.open_checkout("c1", "p1", None, None).await.unwrap();
        queue.place(&isbn, "p2").await.unwrap();

        assert!(ledger.open_checkout("c1", "p2", None, None).await.is_err());
        assert_eq!(queue.position_for(&isbn, "p2").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_on_one_copy() {
        let fx = Fixture::new().await;
        fx.copy("c1", ISBN_A).await;
        fx.person("p1", &[Capability::Borrow], Limits::default()).await;
        fx.person("p2", &[Capability::Borrow], Limits::default()).await;
        let ledger = fx.ledger();

        let (a, b) = tokio::join!(
            ledger.open_checkout("c1", "p1", None, None),
            ledger.open_checkout("c1", "p2", None, None),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.into_iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            denial(loser),
            CoreError::CheckoutDenied(CheckoutDenial::AlreadyOut { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_against_a_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("shelf.db")).max_connections(4))
            .await
            .unwrap();
        let fx = Fixture::with_db(db, ManualClock::new(t0()));
        fx.copy("c1", ISBN_A).await;

        let mut tasks = Vec::new();
        for n in 0..4 {
            let person_id = format!("p{}", n);
            fx.person(&person_id, &[Capability::Borrow], Limits::default()).await;

            let ledger = fx.ledger();
            let policy = RetryPolicy {
                max_attempts: 20,
                ..RetryPolicy::default()
            };
            tasks.push(tokio::spawn(async move {
                retry_on_conflict(&policy, || ledger.open_checkout("c1", &person_id, None, None))
                    .await
            }));
        }

        let mut opened = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => opened += 1,
                Err(LendingError::Domain(CoreError::CheckoutDenied(CheckoutDenial::AlreadyOut {
                    ..
                }))) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(opened, 1);

        let mut conn = fx.db.acquire().await.unwrap();
        assert_eq!(checkouts::list_by_copy(&mut conn, "c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_copy_and_list() {
        let fx = Fixture::new().await;
        let isbn = Isbn::parse("0-306-40615-2").unwrap();
        let ledger = fx.ledger();

        let first = ledger.add_copy(&isbn).await.unwrap();
        fx.clock.advance(Duration::minutes(1));
        let second = ledger.add_copy(&isbn).await.unwrap();

        let shelved = ledger.copies_of(&isbn).await.unwrap();
        let ids: Vec<&str> = shelved.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert_eq!(ledger.availability(&isbn).await.unwrap(), 2);
    }
}

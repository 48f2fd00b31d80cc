//! # Checkout Repository
//!
//! Loans. The partial unique index `idx_checkouts_open_copy` guarantees at
//! most one open checkout per copy; [`insert_if_copy_free`] additionally
//! checks inside the statement so the common race never reaches the index.
//!
//! ## Open / Close Lifecycle
//! ```text
//!   insert_if_copy_free ──► completed = 0, end_at = NULL
//!            │
//!            ▼
//!   close (WHERE completed = 0) ──► completed = 1, end_at = now
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use shelf_core::{Checkout, Isbn};

const CHECKOUT_COLUMNS: &str =
    "id, copy_id, person_id, start_at, due_at, end_at, completed, penalty_rate_cents";

/// Inserts an open checkout unless the copy already has one.
///
/// ## Returns
/// * `Ok(true)` - Checkout created
/// * `Ok(false)` - Copy already out (seen in the snapshot or via the index)
pub async fn insert_if_copy_free(conn: &mut SqliteConnection, checkout: &Checkout) -> DbResult<bool> {
    debug!(copy_id = %checkout.copy_id, person_id = %checkout.person_id, "Inserting checkout");

    let result = sqlx::query(
        r#"
        INSERT INTO checkouts (
            id, copy_id, person_id, start_at, due_at, end_at, completed, penalty_rate_cents
        )
        SELECT ?1, ?2, ?3, ?4, ?5, NULL, 0, ?6
        WHERE NOT EXISTS (
            SELECT 1 FROM checkouts WHERE copy_id = ?2 AND completed = 0
        )
        "#,
    )
    .bind(&checkout.id)
    .bind(&checkout.copy_id)
    .bind(&checkout.person_id)
    .bind(checkout.start_at)
    .bind(checkout.due_at)
    .bind(checkout.penalty_rate)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(done) => Ok(done.rows_affected() == 1),
        Err(err) => match DbError::from(err) {
            DbError::UniqueViolation { .. } => Ok(false),
            other => Err(other),
        },
    }
}

/// The open checkout for a copy, if any.
pub async fn find_open_by_copy(conn: &mut SqliteConnection, copy_id: &str) -> DbResult<Option<Checkout>> {
    let sql = format!(
        "SELECT {} FROM checkouts WHERE copy_id = ?1 AND completed = 0",
        CHECKOUT_COLUMNS
    );
    let checkout = sqlx::query_as::<_, Checkout>(&sql)
        .bind(copy_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(checkout)
}

/// Closes an open checkout.
///
/// ## Returns
/// * `Ok(true)` - Checkout closed by this call
/// * `Ok(false)` - Already closed (or missing)
pub async fn close(conn: &mut SqliteConnection, id: &str, end_at: DateTime<Utc>) -> DbResult<bool> {
    debug!(checkout_id = %id, "Closing checkout");

    let result = sqlx::query(
        "UPDATE checkouts SET end_at = ?2, completed = 1 WHERE id = ?1 AND completed = 0",
    )
    .bind(id)
    .bind(end_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Number of open checkouts held by a person.
pub async fn count_open_by_person(conn: &mut SqliteConnection, person_id: &str) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM checkouts WHERE person_id = ?1 AND completed = 0",
    )
    .bind(person_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Number of open checkouts across all copies of an ISBN.
pub async fn count_open_by_isbn(conn: &mut SqliteConnection, isbn: &Isbn) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM checkouts c
        INNER JOIN copies k ON k.id = c.copy_id
        WHERE k.isbn = ?1 AND c.completed = 0
        "#,
    )
    .bind(isbn.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// True when the person has a copy of this ISBN out right now.
pub async fn person_has_open_for_isbn(
    conn: &mut SqliteConnection,
    person_id: &str,
    isbn: &Isbn,
) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1
        FROM checkouts c
        INNER JOIN copies k ON k.id = c.copy_id
        WHERE c.person_id = ?1 AND k.isbn = ?2 AND c.completed = 0
        LIMIT 1
        "#,
    )
    .bind(person_id)
    .bind(isbn.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}

/// Open checkouts for a person, earliest due first.
pub async fn list_open_by_person(conn: &mut SqliteConnection, person_id: &str) -> DbResult<Vec<Checkout>> {
    let sql = format!(
        "SELECT {} FROM checkouts WHERE person_id = ?1 AND completed = 0 ORDER BY due_at, rowid",
        CHECKOUT_COLUMNS
    );
    let checkouts = sqlx::query_as::<_, Checkout>(&sql)
        .bind(person_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(checkouts)
}

/// Every checkout of a copy, most recent first.
pub async fn list_by_copy(conn: &mut SqliteConnection, copy_id: &str) -> DbResult<Vec<Checkout>> {
    let sql = format!(
        "SELECT {} FROM checkouts WHERE copy_id = ?1 ORDER BY start_at DESC, rowid DESC",
        CHECKOUT_COLUMNS
    );
    let checkouts = sqlx::query_as::<_, Checkout>(&sql)
        .bind(copy_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(checkouts)
}

/// Gets a checkout by its ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Checkout>> {
    let sql = format!("SELECT {} FROM checkouts WHERE id = ?1", CHECKOUT_COLUMNS);
    let checkout = sqlx::query_as::<_, Checkout>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(checkout)
}

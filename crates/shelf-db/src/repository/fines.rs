//! # Fine Repository
//!
//! Fines are written once, when an overdue checkout closes. Marking them
//! paid happens elsewhere.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use shelf_core::Fine;

const FINE_COLUMNS: &str =
    "id, checkout_id, copy_id, person_id, assessed_at, amount_cents, completed";

/// Inserts a fine. A second fine for the same checkout is a UniqueViolation.
pub async fn insert(conn: &mut SqliteConnection, fine: &Fine) -> DbResult<()> {
    debug!(checkout_id = %fine.checkout_id, amount = %fine.amount, "Inserting fine");

    sqlx::query(
        r#"
        INSERT INTO fines (id, checkout_id, copy_id, person_id, assessed_at, amount_cents, completed)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&fine.id)
    .bind(&fine.checkout_id)
    .bind(&fine.copy_id)
    .bind(&fine.person_id)
    .bind(fine.assessed_at)
    .bind(fine.amount)
    .bind(fine.completed)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// The fine assessed for a checkout, if any.
pub async fn find_by_checkout(conn: &mut SqliteConnection, checkout_id: &str) -> DbResult<Option<Fine>> {
    let sql = format!("SELECT {} FROM fines WHERE checkout_id = ?1", FINE_COLUMNS);
    let fine = sqlx::query_as::<_, Fine>(&sql)
        .bind(checkout_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(fine)
}

/// All fines for a person, newest first.
pub async fn list_by_person(conn: &mut SqliteConnection, person_id: &str) -> DbResult<Vec<Fine>> {
    let sql = format!(
        "SELECT {} FROM fines WHERE person_id = ?1 ORDER BY assessed_at DESC, rowid DESC",
        FINE_COLUMNS
    );
    let fines = sqlx::query_as::<_, Fine>(&sql)
        .bind(person_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(fines)
}

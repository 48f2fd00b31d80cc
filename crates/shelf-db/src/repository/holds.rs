//! # Hold Repository
//!
//! The reservation queue. Pending holds for an ISBN are read in FIFO order:
//! `placed_at` ascending, ties broken by `rowid` (insertion order).

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use shelf_core::{Hold, HoldResolution, Isbn};

const HOLD_COLUMNS: &str = "id, person_id, isbn, placed_at, completed, resolution, completed_at";

/// Appends a pending hold unless the person already has one for the ISBN.
///
/// ## Returns
/// * `Ok(true)` - Hold created
/// * `Ok(false)` - A pending hold already exists
pub async fn insert_if_absent(conn: &mut SqliteConnection, hold: &Hold) -> DbResult<bool> {
    debug!(person_id = %hold.person_id, isbn = %hold.isbn, "Inserting hold");

    let result = sqlx::query(
        r#"
        INSERT INTO holds (id, person_id, isbn, placed_at, completed, resolution, completed_at)
        SELECT ?1, ?2, ?3, ?4, 0, NULL, NULL
        WHERE NOT EXISTS (
            SELECT 1 FROM holds WHERE person_id = ?2 AND isbn = ?3 AND completed = 0
        )
        "#,
    )
    .bind(&hold.id)
    .bind(&hold.person_id)
    .bind(hold.isbn.to_string())
    .bind(hold.placed_at)
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

/// Gets a hold by its ID, pending or not.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Hold>> {
    let sql = format!("SELECT {} FROM holds WHERE id = ?1", HOLD_COLUMNS);
    let hold = sqlx::query_as::<_, Hold>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(hold)
}

/// Pending holds for an ISBN in queue order.
pub async fn list_pending_by_isbn(conn: &mut SqliteConnection, isbn: &Isbn) -> DbResult<Vec<Hold>> {
    let sql = format!(
        "SELECT {} FROM holds WHERE isbn = ?1 AND completed = 0 ORDER BY placed_at, rowid",
        HOLD_COLUMNS
    );
    let holds = sqlx::query_as::<_, Hold>(&sql)
        .bind(isbn.to_string())
        .fetch_all(&mut *conn)
        .await?;

    Ok(holds)
}

/// Pending holds for a person, oldest first.
pub async fn list_pending_by_person(conn: &mut SqliteConnection, person_id: &str) -> DbResult<Vec<Hold>> {
    let sql = format!(
        "SELECT {} FROM holds WHERE person_id = ?1 AND completed = 0 ORDER BY placed_at, rowid",
        HOLD_COLUMNS
    );
    let holds = sqlx::query_as::<_, Hold>(&sql)
        .bind(person_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(holds)
}

/// The person's pending hold on an ISBN, if any.
pub async fn find_pending(
    conn: &mut SqliteConnection,
    person_id: &str,
    isbn: &Isbn,
) -> DbResult<Option<Hold>> {
    let sql = format!(
        "SELECT {} FROM holds WHERE person_id = ?1 AND isbn = ?2 AND completed = 0",
        HOLD_COLUMNS
    );
    let hold = sqlx::query_as::<_, Hold>(&sql)
        .bind(person_id)
        .bind(isbn.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(hold)
}

/// Zero-based FIFO rank of the person's pending hold on an ISBN.
pub async fn position_of(
    conn: &mut SqliteConnection,
    isbn: &Isbn,
    person_id: &str,
) -> DbResult<Option<usize>> {
    let queue = list_pending_by_isbn(conn, isbn).await?;
    Ok(queue.iter().position(|h| h.person_id == person_id))
}

/// Completes a pending hold with the given resolution.
///
/// ## Returns
/// * `Ok(true)` - Hold resolved by this call
/// * `Ok(false)` - Hold was not pending
pub async fn resolve(
    conn: &mut SqliteConnection,
    id: &str,
    resolution: HoldResolution,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(hold_id = %id, ?resolution, "Resolving hold");

    let result = sqlx::query(
        r#"
        UPDATE holds
        SET completed = 1, resolution = ?2, completed_at = ?3
        WHERE id = ?1 AND completed = 0
        "#,
    )
    .bind(id)
    .bind(resolution)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

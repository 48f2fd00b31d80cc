//! # Copy Repository
//!
//! Physical copies. A copy never changes its ISBN once shelved.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use shelf_core::{BookCopy, Isbn};

/// Inserts a new copy.
pub async fn insert(conn: &mut SqliteConnection, copy: &BookCopy) -> DbResult<()> {
    debug!(copy_id = %copy.id, isbn = %copy.isbn, "Inserting copy");

    sqlx::query("INSERT INTO copies (id, isbn, created_at) VALUES (?1, ?2, ?3)")
        .bind(&copy.id)
        .bind(copy.isbn.to_string())
        .bind(copy.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Gets a copy by its ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<BookCopy>> {
    let copy = sqlx::query_as::<_, BookCopy>(
        "SELECT id, isbn, created_at FROM copies WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(copy)
}

/// Lists every copy of an ISBN, oldest first.
pub async fn list_by_isbn(conn: &mut SqliteConnection, isbn: &Isbn) -> DbResult<Vec<BookCopy>> {
    let copies = sqlx::query_as::<_, BookCopy>(
        r#"
        SELECT id, isbn, created_at
        FROM copies
        WHERE isbn = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(isbn.to_string())
    .fetch_all(&mut *conn)
    .await?;

    debug!(isbn = %isbn, count = copies.len(), "Listed copies");
    Ok(copies)
}

/// Number of copies shelved for an ISBN.
pub async fn count_by_isbn(conn: &mut SqliteConnection, isbn: &Isbn) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM copies WHERE isbn = ?1")
        .bind(isbn.to_string())
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

/// Helper to generate a new copy ID.
pub fn generate_copy_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

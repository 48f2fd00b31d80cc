//! # Person Repository
//!
//! People, their capability sets and limits. The password hash column is
//! only reachable through [`set_password_hash`] and [`password_hash`].

use sqlx::types::Json;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use shelf_core::Person;

const PERSON_COLUMNS: &str = "id, name, email, permissions, limit_books, limit_days, created_at";

/// Inserts a new person, optionally with an already-hashed password.
pub async fn insert(
    conn: &mut SqliteConnection,
    person: &Person,
    password_hash: Option<&str>,
) -> DbResult<()> {
    debug!(person_id = %person.id, "Inserting person");

    sqlx::query(
        r#"
        INSERT INTO persons (
            id, name, email, password_hash, permissions, limit_books, limit_days, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&person.id)
    .bind(&person.name)
    .bind(&person.email)
    .bind(password_hash)
    .bind(Json(&person.permissions))
    .bind(person.limits.books)
    .bind(person.limits.days)
    .bind(person.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a person by ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Person>> {
    let sql = format!("SELECT {} FROM persons WHERE id = ?1", PERSON_COLUMNS);
    let person = sqlx::query_as::<_, Person>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(person)
}

/// Writes name, email, permissions and limits back.
///
/// ## Returns
/// * `Ok(())` - Update successful
/// * `Err(DbError::NotFound)` - Person doesn't exist
pub async fn update(conn: &mut SqliteConnection, person: &Person) -> DbResult<()> {
    debug!(person_id = %person.id, "Updating person");

    let result = sqlx::query(
        r#"
        UPDATE persons SET
            name = ?2,
            email = ?3,
            permissions = ?4,
            limit_books = ?5,
            limit_days = ?6
        WHERE id = ?1
        "#,
    )
    .bind(&person.id)
    .bind(&person.name)
    .bind(&person.email)
    .bind(Json(&person.permissions))
    .bind(person.limits.books)
    .bind(person.limits.days)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Person", &person.id));
    }

    Ok(())
}

/// Replaces the stored password hash.
pub async fn set_password_hash(conn: &mut SqliteConnection, id: &str, hash: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE persons SET password_hash = ?2 WHERE id = ?1")
        .bind(id)
        .bind(hash)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Person", id));
    }

    Ok(())
}

/// The stored password hash, if one was ever set.
pub async fn password_hash(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<String>> {
    let hash: Option<Option<String>> =
        sqlx::query_scalar("SELECT password_hash FROM persons WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(hash.flatten())
}

/// Counts people (for diagnostics and the seed tool).
pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM persons")
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

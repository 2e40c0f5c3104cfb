// Database queries for users

use crate::db::schema::User;
use crate::errors::{AppError, Result};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

/// Map a unique-index violation on `users.email` to a conflict
fn map_unique_email(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::EmailAlreadyExists,
        _ => AppError::Database(err),
    }
}

/// Insert a new user
pub async fn create(pool: &PgPool, name: &str, email: &str, password_hash: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(map_unique_email)?;

    tracing::info!("Created user {}", user.id);

    Ok(user)
}

/// Get a user by ID
pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Get a user by email
pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Check if an active user exists by email
pub async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND deleted_at IS NULL)",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// List users ordered by ID
pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE deleted_at IS NULL
        ORDER BY id
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;

    Ok(total)
}

/// Update the provided fields; `None` leaves a column unchanged
pub async fn update(
    pool: &PgPool,
    id: i64,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(map_unique_email)?;

    Ok(user)
}

/// Soft-delete a user together with their posts
pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    let posts = sqlx::query(
        "UPDATE posts SET deleted_at = NOW() WHERE user_id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Deleted user {} and {} of their posts",
        id,
        posts.rows_affected()
    );

    Ok(true)
}

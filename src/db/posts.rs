// Database queries for posts

use crate::db::schema::Post;
use crate::errors::Result;
use sqlx::PgPool;

/// Posts joined with their (non-deleted) author
const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.user_id, p.created_at, p.updated_at,
           u.name AS author_name, u.email AS author_email
    FROM posts p
    JOIN users u ON u.id = p.user_id AND u.deleted_at IS NULL
"#;

/// Insert a new post and return it with its author
pub async fn create(pool: &PgPool, user_id: i64, title: &str, content: &str) -> Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        WITH p AS (
            INSERT INTO posts (title, content, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, user_id, created_at, updated_at
        )
        SELECT p.id, p.title, p.content, p.user_id, p.created_at, p.updated_at,
               u.name AS author_name, u.email AS author_email
        FROM p
        JOIN users u ON u.id = p.user_id
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    tracing::info!("Created post {} for user {}", post.id, user_id);

    Ok(post)
}

/// Get a post by ID
pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(&format!(
        "{POST_SELECT} WHERE p.id = $1 AND p.deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        "{POST_SELECT} WHERE p.deleted_at IS NULL ORDER BY p.id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM posts p
        JOIN users u ON u.id = p.user_id AND u.deleted_at IS NULL
        WHERE p.deleted_at IS NULL
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(total)
}

pub async fn list_by_user(pool: &PgPool, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"{POST_SELECT}
        WHERE p.user_id = $1 AND p.deleted_at IS NULL
        ORDER BY p.id
        LIMIT $2 OFFSET $3"#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

pub async fn count_by_user(pool: &PgPool, user_id: i64) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts WHERE user_id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Update a post owned by `user_id`; returns `None` when no such post exists
pub async fn update_owned(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    title: Option<&str>,
    content: Option<&str>,
) -> Result<Option<Post>> {
    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE posts
        SET title = COALESCE($3, title),
            content = COALESCE($4, content),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(content)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(id) => get_by_id(pool, id).await,
        None => Ok(None),
    }
}

/// Soft-delete a post owned by `user_id`
pub async fn delete_owned(pool: &PgPool, id: i64, user_id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET deleted_at = NOW()
        WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

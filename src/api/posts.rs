// Post endpoints

use crate::api::{response::ApiResponse, routes::AppState};
use crate::auth::AuthUser;
use crate::db::{posts, users};
use crate::domain::post::{CreatePostRequest, PostAuthor, PostResponse, UpdatePostRequest};
use crate::domain::{PageMeta, PageQuery};
use crate::errors::{AppError, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PostList {
    pub posts: Vec<PostResponse>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct UserPostList {
    pub posts: Vec<PostResponse>,
    pub user: PostAuthor,
    pub pagination: PageMeta,
}

fn post_list(rows: Vec<crate::db::schema::Post>, page: &PageQuery, total: i64) -> PostList {
    PostList {
        posts: rows.into_iter().map(PostResponse::from).collect(),
        pagination: page.meta(total),
    }
}

/// GET /api/v1/posts
#[tracing::instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<PostList>>> {
    let (total, rows) = tokio::try_join!(
        posts::count(&state.db_pool),
        posts::list(&state.db_pool, page.limit(), page.offset()),
    )?;

    Ok(ApiResponse::success(
        "Posts retrieved successfully",
        post_list(rows, &page, total),
    ))
}

/// GET /api/v1/posts/:id
#[tracing::instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PostResponse>>> {
    let post = posts::get_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::PostNotFound("Post not found".to_string()))?;

    Ok(ApiResponse::success("Post retrieved successfully", post.into()))
}

/// GET /api/v1/users/:id/posts
#[tracing::instrument(skip(state))]
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<UserPostList>>> {
    let user = users::get_by_id(&state.db_pool, user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let (total, rows) = tokio::try_join!(
        posts::count_by_user(&state.db_pool, user_id),
        posts::list_by_user(&state.db_pool, user_id, page.limit(), page.offset()),
    )?;

    let list = post_list(rows, &page, total);

    Ok(ApiResponse::success(
        "User posts retrieved successfully",
        UserPostList {
            posts: list.posts,
            user: PostAuthor {
                id: user.id,
                name: user.name,
                email: user.email,
            },
            pagination: list.pagination,
        },
    ))
}

/// GET /api/v1/user/posts
#[tracing::instrument(skip(state))]
pub async fn list_my_posts(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<PostList>>> {
    let (total, rows) = tokio::try_join!(
        posts::count_by_user(&state.db_pool, auth.user_id),
        posts::list_by_user(&state.db_pool, auth.user_id, page.limit(), page.offset()),
    )?;

    Ok(ApiResponse::success(
        "Your posts retrieved successfully",
        post_list(rows, &page, total),
    ))
}

/// POST /api/v1/posts
#[tracing::instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: std::result::Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PostResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    let post = posts::create(&state.db_pool, auth.user_id, &req.title, &req.content).await?;

    Ok(ApiResponse::success("Post created successfully", post.into()))
}

/// PUT /api/v1/posts/:id
#[tracing::instrument(skip(state, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PostResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    let post = posts::update_owned(&state.db_pool, id, auth.user_id, req.title(), req.content())
        .await?
        .ok_or_else(|| {
            AppError::PostNotFound(
                "Post not found or you don't have permission to edit it".to_string(),
            )
        })?;

    Ok(ApiResponse::success("Post updated successfully", post.into()))
}

/// DELETE /api/v1/posts/:id
#[tracing::instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    if !posts::delete_owned(&state.db_pool, id, auth.user_id).await? {
        return Err(AppError::PostNotFound(
            "Post not found or you don't have permission to delete it".to_string(),
        ));
    }

    Ok(ApiResponse::success("Post deleted successfully", ()))
}

// User endpoints

use crate::api::{response::ApiResponse, routes::AppState};
use crate::auth::AuthUser;
use crate::db::users;
use crate::domain::user::{UpdateUserRequest, UserResponse};
use crate::domain::{PageMeta, PageQuery};
use crate::errors::{AppError, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserResponse>,
    pub pagination: PageMeta,
}

/// GET /api/v1/users
#[tracing::instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<UserList>>> {
    let (total, rows) = tokio::try_join!(
        users::count(&state.db_pool),
        users::list(&state.db_pool, page.limit(), page.offset()),
    )?;

    Ok(ApiResponse::success(
        "Users retrieved successfully",
        UserList {
            users: rows.into_iter().map(UserResponse::from).collect(),
            pagination: page.meta(total),
        },
    ))
}

/// GET /api/v1/users/:id
#[tracing::instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = users::get_by_id(&state.db_pool, id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(ApiResponse::success("User retrieved successfully", user.into()))
}

/// GET /api/v1/user/profile
#[tracing::instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = users::get_by_id(&state.db_pool, auth.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(ApiResponse::success(
        "User profile retrieved successfully",
        user.into(),
    ))
}

/// PUT /api/v1/user/profile
#[tracing::instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    if let Some(email) = req.email() {
        if email != auth.email && users::exists_by_email(&state.db_pool, email).await? {
            return Err(AppError::EmailAlreadyExists);
        }
    }

    let user = users::update(
        &state.db_pool,
        auth.user_id,
        req.name().map(str::trim),
        req.email(),
    )
    .await?
    .ok_or(AppError::UserNotFound)?;

    Ok(ApiResponse::success("User updated successfully", user.into()))
}

/// DELETE /api/v1/user/profile
#[tracing::instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<()>>> {
    if !users::soft_delete(&state.db_pool, auth.user_id).await? {
        return Err(AppError::UserNotFound);
    }

    Ok(ApiResponse::success("User deleted successfully", ()))
}

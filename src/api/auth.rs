// Authentication endpoints

use crate::api::{response::ApiResponse, routes::AppState};
use crate::auth::password;
use crate::db::users;
use crate::domain::user::{CreateUserRequest, LoginRequest, UserResponse};
use crate::errors::{AppError, Result};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: UserResponse,
    pub token: String,
}

/// POST /api/v1/auth/register
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthPayload>>> {
    let Json(req) = payload?;
    req.validate(state.config.auth.password_min_length)?;

    if users::exists_by_email(&state.db_pool, &req.email).await? {
        return Err(AppError::EmailAlreadyExists);
    }

    let password_hash =
        password::hash_password_blocking(req.password, state.config.auth.password_min_length)
            .await?;

    let user = users::create(&state.db_pool, req.name.trim(), &req.email, &password_hash).await?;
    let token = state.jwt.generate_token(user.id, &user.email)?;

    tracing::info!("Registered user {}", user.id);

    Ok(ApiResponse::success(
        "User registered successfully",
        AuthPayload {
            user: user.into(),
            token,
        },
    ))
}

/// POST /api/v1/auth/login
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthPayload>>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = users::get_by_email(&state.db_pool, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid =
        password::verify_password_blocking(req.password, user.password_hash.clone()).await?;

    if !is_valid {
        tracing::warn!("Invalid password for user: {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.generate_token(user.id, &user.email)?;

    tracing::info!("Successful login for user {}", user.id);

    Ok(ApiResponse::success(
        "Login successful",
        AuthPayload {
            user: user.into(),
            token,
        },
    ))
}

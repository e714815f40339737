// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RefreshRequest, RegisterRequest, UserResponse},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH, sign_token, verify_token},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. The email is
/// optional and persisted as an empty string when absent.
/// Returns 201 Created and the public user view (no password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let email = payload.email.unwrap_or_default();

    let user: UserResponse = sqlx::query_as(
        "INSERT INTO users (username, email, password, role, created_at) \
         VALUES (?, ?, ?, 'user', ?) \
         RETURNING id, username, email",
    )
    .bind(&payload.username)
    .bind(&email)
    .bind(&hashed_password)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Row helper carrying only what a credential check needs.
#[derive(sqlx::FromRow)]
struct AuthUser {
    id: i64,
    password: String,
    role: String,
}

/// Authenticates a user and returns an access/refresh token pair.
///
/// The same response is given for an unknown username and a wrong
/// password, so the endpoint does not reveal which usernames exist.
pub async fn obtain_token(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user: Option<AuthUser> =
        sqlx::query_as("SELECT id, password, role FROM users WHERE username = ?")
            .bind(&payload.username)
            .fetch_optional(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Login DB error: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    let user = user.ok_or(AppError::AuthError(
        "Invalid username or password".to_string(),
    ))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let access = sign_token(
        user.id,
        &user.role,
        TOKEN_TYPE_ACCESS,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;
    let refresh = sign_token(
        user.id,
        &user.role,
        TOKEN_TYPE_REFRESH,
        &config.jwt_secret,
        config.jwt_refresh_expiration,
    )?;

    Ok(Json(json!({
        "access": access,
        "refresh": refresh,
    })))
}

/// Exchanges a valid refresh token for a fresh access token.
pub async fn refresh_token(
    State(config): State<Config>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = verify_token(&payload.refresh, TOKEN_TYPE_REFRESH, &config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let access = sign_token(
        user_id,
        &claims.role,
        TOKEN_TYPE_ACCESS,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({ "access": access })))
}

/// Returns the authenticated caller's id, username and email.
pub async fn current_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user: UserResponse =
        sqlx::query_as("SELECT id, username, email FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

// src/handlers/users.rs

use crate::{
    auth::{AuthUser, decode_token, generate_token},
    errors::{AppError, AppResult},
    models::{
        LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, Role,
        TokenType, User, UserPublic,
    },
    services::accounts::{create_user, find_by_username, validate_password, validate_username},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use bcrypt::verify;
use chrono::Duration;
use uuid::Uuid;

/// Register a new taxpayer or agent account
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserPublic),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username already exists"),
    ),
    tag = "Accounts"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserPublic>)> {
    validate_username(&body.username)?;
    validate_password(&body.password, &body.password2)?;

    let role = body.role.unwrap_or(Role::Taxpayer);
    if role == Role::Admin {
        return Err(AppError::Validation(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let user = create_user(&state.db, &body.username, &body.email, &body.password, role).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Login and obtain an access/refresh token pair
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Accounts"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = find_by_username(&state.db, &body.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let config = &state.config;
    let access = generate_token(
        user.id,
        &user.username,
        user.role,
        TokenType::Access,
        &config.jwt_secret,
        Duration::minutes(config.jwt_expiry_minutes),
    )?;
    let refresh = generate_token(
        user.id,
        &user.username,
        user.role,
        TokenType::Refresh,
        &config.jwt_secret,
        Duration::hours(config.jwt_refresh_expiry_hours),
    )?;

    Ok(Json(LoginResponse {
        access,
        refresh,
        user: user.into(),
    }))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token"),
    ),
    tag = "Accounts"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let config = &state.config;
    let claims = decode_token(&body.refresh, &config.jwt_secret, TokenType::Refresh)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    let access = generate_token(
        user_id,
        &claims.username,
        claims.role,
        TokenType::Access,
        &config.jwt_secret,
        Duration::minutes(config.jwt_expiry_minutes),
    )?;

    Ok(Json(RefreshResponse { access }))
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current user", body = UserPublic),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserPublic>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

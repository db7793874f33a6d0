// src/handlers/admin.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    models::{AssignClientRequest, ClientProfile, Role, UserPublic},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

/// List every user account
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserPublic>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserPublic>>> {
    auth.require(Role::Admin)?;

    let users = sqlx::query_as::<_, UserPublic>(
        "SELECT id, username, email, role FROM users ORDER BY created_at ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}

/// Delete a user and everything they own
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let auth = auth.require(Role::Admin)?;

    // Records, uploads, exports and assignments go with the user (ON DELETE CASCADE).
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    info!("User {} deleted by admin '{}'", user_id, auth.username);
    Ok(StatusCode::NO_CONTENT)
}

async fn role_of(state: &AppState, user_id: Uuid) -> AppResult<Role> {
    sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Assign a taxpayer to an agent
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = AssignClientRequest,
    responses(
        (status = 201, description = "Taxpayer assigned", body = ClientProfile),
        (status = 400, description = "Wrong roles"),
        (status = 409, description = "Already assigned"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn assign_client(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<AssignClientRequest>,
) -> AppResult<(StatusCode, Json<ClientProfile>)> {
    auth.require(Role::Admin)?;

    if role_of(&state, body.agent_id).await? != Role::Agent {
        return Err(AppError::Validation(format!(
            "User {} is not an agent",
            body.agent_id
        )));
    }
    if role_of(&state, body.taxpayer_id).await? != Role::Taxpayer {
        return Err(AppError::Validation(format!(
            "User {} is not a taxpayer",
            body.taxpayer_id
        )));
    }

    let profile = sqlx::query_as::<_, ClientProfile>(
        r#"INSERT INTO client_profiles (id, agent_id, taxpayer_id, created_at)
           VALUES ($1, $2, $3, NOW())
           ON CONFLICT (agent_id, taxpayer_id) DO NOTHING
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.agent_id)
    .bind(body.taxpayer_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Conflict("Taxpayer is already assigned to this agent".to_string()))?;

    Ok((StatusCode::CREATED, Json(profile)))
}

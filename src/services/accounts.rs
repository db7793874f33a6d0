// src/services/accounts.rs

use bcrypt::{DEFAULT_COST, hash};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{Role, User},
};

const MIN_PASSWORD_LEN: usize = 8;

/// Password rules applied at registration.
pub fn validate_password(password: &str, confirmation: &str) -> AppResult<()> {
    if password != confirmation {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must contain at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password cannot be entirely numeric".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> AppResult<()> {
    let valid = !username.is_empty()
        && username.len() <= 150
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Username may contain only letters, digits and @/./+/-/_ (max 150)".to_string(),
        ))
    }
}

pub async fn find_by_username(db: &PgPool, username: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

fn username_taken(username: &str) -> AppError {
    AppError::Conflict(format!(
        "A user with username '{}' already exists",
        username
    ))
}

/// A concurrent registration can slip past the lookup in `create_user`; the
/// `users.username` constraint then reports the duplicate.
fn map_insert_error(err: sqlx::Error, username: &str) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => username_taken(username),
        other => AppError::Database(other),
    }
}

pub async fn create_user(
    db: &PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> AppResult<User> {
    if find_by_username(db, username).await?.is_some() {
        return Err(username_taken(username));
    }

    let password_hash =
        hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, username, email, password_hash, role, created_at)
           VALUES ($1, $2, $3, $4, $5, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(db)
    .await
    .map_err(|e| map_insert_error(e, username))?;

    info!("Registered {} '{}' ({})", user.role, user.username, user.id);
    Ok(user)
}

/// Creates the configured admin account on startup if it does not exist yet.
pub async fn ensure_admin(
    db: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> AppResult<()> {
    if find_by_username(db, username).await?.is_some() {
        return Ok(());
    }
    match create_user(db, username, email, password, Role::Admin).await {
        // Another instance created it first.
        Ok(_) | Err(AppError::Conflict(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

use crate::{
    errors::{AppError, AppResult},
    models::{Claims, Role, TokenType},
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

/// Authenticated user extractor.
/// Add `auth: AuthUser` as a parameter in any handler that requires authentication.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Rejects with 403 unless the caller holds `role`.
    pub fn require(self, role: Role) -> AppResult<Self> {
        if self.role == role {
            Ok(self)
        } else {
            Err(AppError::Forbidden(format!(
                "This action requires the '{}' role",
                role
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers: &HeaderMap = &parts.headers;

        let auth_header = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

        let claims = decode_token(token, &state.config.jwt_secret, TokenType::Access)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthUser {
            id: user_id,
            username: claims.username,
            role: claims.role,
        })
    }
}

/// Decodes and verifies a token, insisting on the expected token type.
pub fn decode_token(token: &str, secret: &str, expected: TokenType) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    if token_data.claims.token_type != expected {
        return Err(AppError::InvalidToken);
    }

    Ok(token_data.claims)
}

pub fn generate_token(
    user_id: Uuid,
    username: &str,
    role: Role,
    token_type: TokenType,
    secret: &str,
    lifetime: Duration,
) -> AppResult<String> {
    let now = Utc::now();

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        token_type,
        exp: (now + lifetime).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

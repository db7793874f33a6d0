// src/models/mod.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::paye::PayeBreakdown;

// ─── Users ────────────────────────────────────────────────────────────────────

// sqlx 0.8: custom Postgres enums need #[sqlx(type_name = "...")] on the enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Taxpayer,
    Agent,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Taxpayer => "taxpayer",
            Role::Agent => "agent",
            Role::Admin => "admin",
        };
        f.write_str(label)
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub password2: String,
    /// Defaults to `taxpayer`. Only `taxpayer` and `agent` may self-register.
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserPublic,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access: String,
}

// ─── P9 Uploads ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct P9Form {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Multipart body for `POST /upload-p9`
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct P9UploadForm {
    /// CSV with at least `Basic Salary` and `Benefits` columns
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct P9UploadResponse {
    pub p9: P9Form,
    pub tax_record: TaxRecord,
    pub breakdown: PayeBreakdown,
}

// ─── Tax Records ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
pub struct TaxRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Tax year label, e.g. "2025"
    pub year: String,
    pub gross_income: Decimal,
    pub taxable_income: Decimal,
    pub computed_paye: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculateRequest {
    pub gross_income: Decimal,
    /// Defaults to the server's configured tax year
    pub tax_year: Option<String>,
}

// ─── ZIP Exports ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TaxZip {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ZipResponse {
    pub message: String,
    pub download_url: String,
}

// ─── Agent Clients ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClientProfile {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub taxpayer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignClientRequest {
    pub agent_id: Uuid,
    pub taxpayer_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientTaxRecord {
    pub year: String,
    pub gross_income: Decimal,
    pub taxable_income: Decimal,
    pub computed_paye: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<TaxRecord> for ClientTaxRecord {
    fn from(record: TaxRecord) -> Self {
        ClientTaxRecord {
            year: record.year,
            gross_income: record.gross_income,
            taxable_income: record.taxable_income,
            computed_paye: record.computed_paye,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientSummary {
    /// Assignment ID
    pub id: Uuid,
    pub taxpayer_id: Uuid,
    pub taxpayer_name: String,
    pub taxpayer_email: String,
    pub tax_records: Vec<ClientTaxRecord>,
    pub created_at: DateTime<Utc>,
}

/// Assignment joined with the taxpayer's identity
#[derive(Debug, FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub taxpayer_id: Uuid,
    pub taxpayer_name: String,
    pub taxpayer_email: String,
    pub created_at: DateTime<Utc>,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub token_type: TokenType,
    pub exp: usize,
    pub iat: usize,
}

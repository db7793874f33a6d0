// src/handlers/agent.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    handlers::tax::export_zip,
    models::{ClientRow, ClientSummary, ClientTaxRecord, Role, TaxRecord, ZipResponse},
    services::tax_record::{PgTaxRecordStore, TaxRecordStore},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use std::collections::HashMap;
use uuid::Uuid;

const CLIENT_COLUMNS: &str = r#"SELECT cp.id, cp.taxpayer_id, u.username AS taxpayer_name,
           u.email AS taxpayer_email, cp.created_at
       FROM client_profiles cp
       JOIN users u ON u.id = cp.taxpayer_id"#;

/// List the taxpayers assigned to the authenticated agent, with their records
#[utoipa::path(
    get,
    path = "/api/v1/agent/clients",
    responses(
        (status = 200, description = "Assigned clients", body = Vec<ClientSummary>),
        (status = 403, description = "Agents only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Agents"
)]
pub async fn list_clients(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ClientSummary>>> {
    let auth = auth.require(Role::Agent)?;

    let clients = sqlx::query_as::<_, ClientRow>(&format!(
        "{} WHERE cp.agent_id = $1 ORDER BY cp.created_at ASC",
        CLIENT_COLUMNS
    ))
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let taxpayer_ids: Vec<Uuid> = clients.iter().map(|c| c.taxpayer_id).collect();
    let records = sqlx::query_as::<_, TaxRecord>(
        "SELECT * FROM tax_records WHERE user_id = ANY($1) ORDER BY created_at ASC",
    )
    .bind(&taxpayer_ids)
    .fetch_all(&state.db)
    .await?;

    let mut by_owner: HashMap<Uuid, Vec<ClientTaxRecord>> = HashMap::new();
    for record in records {
        by_owner
            .entry(record.user_id)
            .or_default()
            .push(record.into());
    }

    let summaries = clients
        .into_iter()
        .map(|c| ClientSummary {
            tax_records: by_owner.get(&c.taxpayer_id).cloned().unwrap_or_default(),
            id: c.id,
            taxpayer_id: c.taxpayer_id,
            taxpayer_name: c.taxpayer_name,
            taxpayer_email: c.taxpayer_email,
            created_at: c.created_at,
        })
        .collect();

    Ok(Json(summaries))
}

/// Generate a ZIP bundle for one of the agent's clients
#[utoipa::path(
    get,
    path = "/api/v1/agent/clients/{taxpayer_id}/zip",
    params(("taxpayer_id" = Uuid, Path, description = "Taxpayer user ID")),
    responses(
        (status = 200, description = "ZIP generated", body = ZipResponse),
        (status = 404, description = "Client not assigned or has no records"),
        (status = 403, description = "Agents only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Agents"
)]
pub async fn export_client_zip(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(taxpayer_id): Path<Uuid>,
) -> AppResult<Json<ZipResponse>> {
    let auth = auth.require(Role::Agent)?;

    let client = sqlx::query_as::<_, ClientRow>(&format!(
        "{} WHERE cp.agent_id = $1 AND cp.taxpayer_id = $2",
        CLIENT_COLUMNS
    ))
    .bind(auth.id)
    .bind(taxpayer_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Client {} is not assigned to you", taxpayer_id)))?;

    let records = PgTaxRecordStore::new(state.db.clone())
        .list_for_user(client.taxpayer_id)
        .await?;

    if records.is_empty() {
        return Err(AppError::NotFound(format!(
            "No tax records found for {}.",
            client.taxpayer_name
        )));
    }

    let response = export_zip(&state, &auth, &client.taxpayer_name, &records).await?;
    Ok(Json(response))
}

// src/handlers/tax.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    models::{
        CalculateRequest, P9UploadForm, P9UploadResponse, Role, TaxRecord, TaxZip, ZipResponse,
    },
    services::{
        export::{archive_file_name, export_records},
        income::{aggregate_gross_income, ensure_storable, read_rows},
        media::{read_archive, save_archive, save_p9},
        paye::{PayeBreakdown, compute_paye},
        schedule::TaxSchedule,
        tax_record::{NewTaxRecord, PgTaxRecordStore, TaxRecordStore},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Upload a P9 statement and compute PAYE from it
#[utoipa::path(
    post,
    path = "/api/v1/upload-p9",
    request_body(content = P9UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "P9 stored and tax computed", body = P9UploadResponse),
        (status = 400, description = "Missing or unreadable file, or income too large to store"),
        (status = 403, description = "Taxpayers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tax"
)]
pub async fn upload_p9(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<P9UploadResponse>> {
    let auth = auth.require(Role::Taxpayer)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("p9.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file was submitted".to_string()))?;

    // Compute before writing anything so a bad file leaves no trace.
    let rows = read_rows(&bytes)?;
    let gross_income = ensure_storable(aggregate_gross_income(&rows))?;
    let schedule = state.schedules.get(&state.config.tax_year)?;
    let breakdown = compute_paye(&schedule, gross_income)?;

    info!(
        "P9 from '{}': {} rows, gross {}, PAYE {}",
        auth.username,
        rows.len(),
        gross_income,
        breakdown.computed_paye
    );

    let record = NewTaxRecord::from_breakdown(auth.id, &breakdown);
    let (p9, tax_record) =
        save_p9(&state.db, &state.config.media_root, &file_name, &bytes, record).await?;

    Ok(Json(P9UploadResponse {
        p9,
        tax_record,
        breakdown,
    }))
}

/// List the authenticated taxpayer's tax records
#[utoipa::path(
    get,
    path = "/api/v1/tax-records",
    responses(
        (status = 200, description = "Tax records, oldest first", body = Vec<TaxRecord>),
        (status = 403, description = "Taxpayers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tax"
)]
pub async fn list_tax_records(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TaxRecord>>> {
    let auth = auth.require(Role::Taxpayer)?;
    let records = PgTaxRecordStore::new(state.db.clone())
        .list_for_user(auth.id)
        .await?;

    Ok(Json(records))
}

/// Preview a PAYE computation without storing anything
#[utoipa::path(
    post,
    path = "/api/v1/tax/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "PAYE breakdown", body = PayeBreakdown),
        (status = 400, description = "Negative income"),
        (status = 404, description = "No schedule for the requested year"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tax"
)]
pub async fn calculate(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CalculateRequest>,
) -> AppResult<Json<PayeBreakdown>> {
    let year = body.tax_year.as_deref().unwrap_or(&state.config.tax_year);
    let schedule = state.schedules.get(year)?;

    Ok(Json(compute_paye(&schedule, body.gross_income)?))
}

/// List the configured PAYE schedules
#[utoipa::path(
    get,
    path = "/api/v1/tax/schedules",
    responses((status = 200, description = "Schedules by tax year", body = Vec<TaxSchedule>)),
    security(("bearer_auth" = [])),
    tag = "Tax"
)]
pub async fn list_schedules(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<TaxSchedule>> {
    Json(state.schedules.all().cloned().collect())
}

/// Build and store a ZIP of `records`, owned by `owner`.
pub(crate) async fn export_zip(
    state: &AppState,
    owner: &AuthUser,
    subject_username: &str,
    records: &[TaxRecord],
) -> AppResult<ZipResponse> {
    let now = Utc::now();
    let bytes = export_records(records, now)?;
    let file_name = archive_file_name(subject_username, now);
    let zip = save_archive(&state.db, &state.config.media_root, owner.id, &file_name, &bytes).await?;

    Ok(ZipResponse {
        message: "ZIP file generated successfully".to_string(),
        download_url: state.config.download_url(zip.id),
    })
}

/// Generate a ZIP bundle with the taxpayer's tax summary
#[utoipa::path(
    get,
    path = "/api/v1/generate-zip",
    responses(
        (status = 200, description = "ZIP generated", body = ZipResponse),
        (status = 404, description = "No tax records found for user"),
        (status = 403, description = "Taxpayers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn generate_zip(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ZipResponse>> {
    let auth = auth.require(Role::Taxpayer)?;
    let records = PgTaxRecordStore::new(state.db.clone())
        .list_for_user(auth.id)
        .await?;

    if records.is_empty() {
        return Err(AppError::NotFound(
            "No tax records found for user.".to_string(),
        ));
    }

    let response = export_zip(&state, &auth, &auth.username, &records).await?;
    Ok(Json(response))
}

/// Download a previously generated ZIP bundle
#[utoipa::path(
    get,
    path = "/api/v1/exports/{zip_id}/download",
    params(("zip_id" = Uuid, Path, description = "Export ID")),
    responses(
        (status = 200, description = "ZIP archive (application/zip)"),
        (status = 404, description = "Export not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn download_zip(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(zip_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let zip = sqlx::query_as::<_, TaxZip>("SELECT * FROM tax_zips WHERE id = $1 AND user_id = $2")
        .bind(zip_id)
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Export {} not found", zip_id)))?;

    let bytes = read_archive(&zip).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", zip.file_name),
            ),
        ],
        bytes,
    ))
}

// src/openapi.rs

use crate::{
    models::{
        AssignClientRequest, CalculateRequest, ClientProfile, ClientSummary, ClientTaxRecord,
        LoginRequest, LoginResponse, P9Form, P9UploadForm, P9UploadResponse, RefreshRequest,
        RefreshResponse, RegisterRequest, Role, TaxRecord, UserPublic, ZipResponse,
    },
    services::{
        paye::{PayeBreakdown, StatutoryFigures},
        schedule::{StatutoryRates, TaxBand, TaxSchedule},
    },
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taxika API",
        version = "1.0.0",
        description = "Tax-filing assistant API built with Rust and Axum. \
            Taxpayers upload P9 statements and get PAYE computed from statutory bands, \
            export their tax summaries as ZIP bundles, and delegated agents view and \
            export records for the taxpayers assigned to them.",
        license(name = "MIT")
    ),
    paths(
        // Accounts
        crate::handlers::users::register,
        crate::handlers::users::login,
        crate::handlers::users::refresh_token,
        crate::handlers::users::me,
        // Tax
        crate::handlers::tax::upload_p9,
        crate::handlers::tax::list_tax_records,
        crate::handlers::tax::calculate,
        crate::handlers::tax::list_schedules,
        // Exports
        crate::handlers::tax::generate_zip,
        crate::handlers::tax::download_zip,
        // Agents
        crate::handlers::agent::list_clients,
        crate::handlers::agent::export_client_zip,
        // Admin
        crate::handlers::admin::list_users,
        crate::handlers::admin::delete_user,
        crate::handlers::admin::assign_client,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
            UserPublic, Role,
            P9Form, P9UploadForm, P9UploadResponse, TaxRecord, CalculateRequest,
            PayeBreakdown, StatutoryFigures, TaxSchedule, TaxBand, StatutoryRates,
            ZipResponse,
            ClientSummary, ClientTaxRecord, ClientProfile, AssignClientRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Accounts", description = "Register, login and refresh tokens"),
        (name = "Tax", description = "Upload P9 statements and compute PAYE"),
        (name = "Exports", description = "Generate and download tax summary bundles"),
        (name = "Agents", description = "View and export assigned taxpayers' records"),
        (name = "Admin", description = "Manage users and agent assignments"),
    )
)]
pub struct ApiDoc;

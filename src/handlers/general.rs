use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Root handler, returns an HTML landing page with project info and links
pub async fn root_handler() -> impl IntoResponse {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>Taxika API</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: 'Segoe UI', system-ui, sans-serif; background: #0f172a; color: #e2e8f0; min-height: 100vh; padding: 40px 20px; }
    .container { max-width: 860px; margin: 0 auto; }
    header { text-align: center; margin-bottom: 40px; }
    header h1 { font-size: 2.6rem; font-weight: 800; color: #34d399; margin-bottom: 8px; }
    header p { color: #94a3b8; font-size: 1.05rem; }
    .links { display: flex; gap: 12px; justify-content: center; margin-bottom: 32px; }
    .links a { background: #1e293b; border: 1px solid #334155; color: #38bdf8; padding: 8px 18px; border-radius: 8px; text-decoration: none; }
    .route-group { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 18px 20px; margin-bottom: 16px; }
    .route-group h4 { color: #f1f5f9; margin-bottom: 10px; }
    .route-item { display: flex; gap: 12px; align-items: center; padding: 4px 0; font-size: 0.875rem; }
    .method { font-weight: 700; width: 64px; }
    .get { color: #34d399; } .post { color: #60a5fa; } .delete { color: #f87171; }
    .route-path { font-family: monospace; color: #e2e8f0; min-width: 300px; }
    .route-desc { color: #94a3b8; }
    footer { text-align: center; color: #64748b; margin-top: 32px; font-size: 0.85rem; }
  </style>
</head>
<body>
<div class="container">
  <header>
    <h1>Taxika</h1>
    <p>Upload a P9, get your PAYE computed, export your tax summary.</p>
  </header>

  <div class="links">
    <a href="/docs">Swagger UI</a>
    <a href="/health">Health</a>
  </div>

  <div class="route-group">
    <h4>Accounts</h4>
    <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/register</span><span class="route-desc">Register as a taxpayer or agent</span></div>
    <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/login</span><span class="route-desc">Obtain access and refresh tokens</span></div>
    <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/token/refresh</span><span class="route-desc">Refresh an access token</span></div>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/me</span><span class="route-desc">Current user</span></div>
  </div>

  <div class="route-group">
    <h4>Tax</h4>
    <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/upload-p9</span><span class="route-desc">Upload a P9 CSV and compute PAYE</span></div>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/tax-records</span><span class="route-desc">Your tax records</span></div>
    <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/tax/calculate</span><span class="route-desc">Preview PAYE for an income</span></div>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/tax/schedules</span><span class="route-desc">Configured tax bands</span></div>
  </div>

  <div class="route-group">
    <h4>Exports</h4>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/generate-zip</span><span class="route-desc">Bundle your tax summary as a ZIP</span></div>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/exports/:id/download</span><span class="route-desc">Download a generated ZIP</span></div>
  </div>

  <div class="route-group">
    <h4>Agents &amp; Admin</h4>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/agent/clients</span><span class="route-desc">Assigned taxpayers and their records</span></div>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/agent/clients/:id/zip</span><span class="route-desc">Export a client's tax summary</span></div>
    <div class="route-item"><span class="method get">GET</span><span class="route-path">/api/v1/users</span><span class="route-desc">List users</span></div>
    <div class="route-item"><span class="method delete">DELETE</span><span class="route-path">/api/v1/users/:id</span><span class="route-desc">Delete a user</span></div>
    <div class="route-item"><span class="method post">POST</span><span class="route-path">/api/v1/clients</span><span class="route-desc">Assign a taxpayer to an agent</span></div>
  </div>

  <footer>
    <p>Built with 🦀 Rust · Axum · SQLx</p>
  </footer>
</div>
</body>
</html>"#)
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "taxika",
                "tax_year": state.config.tax_year,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

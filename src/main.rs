use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod errors;
mod handlers;
mod models;
mod openapi;
mod routes;
mod services;
mod state;

use config::Config;
use routes::app_router;
use services::{accounts::ensure_admin, schedule::ScheduleRegistry};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ─── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taxika=debug,tower_http=info")),
        )
        .init();

    // ─── Config ───────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Invalid configuration")?;
    let addr = config.server_addr();

    // ─── Tax Schedules ────────────────────────────────────────────────────────
    // A bad schedule would mis-tax every user, so refuse to start.
    let schedules = ScheduleRegistry::load(config.tax_schedule_path.as_deref())
        .context("Failed to load tax schedules")?;
    schedules
        .get(&config.tax_year)
        .with_context(|| format!("TAX_YEAR {} has no schedule", config.tax_year))?;
    info!(
        "Tax schedules loaded for {:?}; uploads use {}",
        schedules.years(),
        config.tax_year
    );

    // ─── Database ─────────────────────────────────────────────────────────────
    let db = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;

    info!("Database connected and migrations applied ✓");

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        ensure_admin(&db, username, &config.admin_email, password)
            .await
            .context("Failed to create admin account")?;
        info!("Admin account '{}' ready", username);
    }

    // ─── Router ───────────────────────────────────────────────────────────────
    let state = AppState::new(db, config, schedules);
    let app = app_router(state);

    // ─── Start Server ─────────────────────────────────────────────────────────
    info!("🚀 Taxika API listening on http://{}", addr);
    info!("📖 Swagger UI:  http://{}/docs", addr);
    info!("❤️  Health:      http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}

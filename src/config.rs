use dotenvy::dotenv;
use std::{env, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub jwt_refresh_expiry_hours: i64,
    /// Year label stamped on records created from uploads
    pub tax_year: String,
    pub tax_schedule_path: Option<PathBuf>,
    pub media_root: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub admin_username: Option<String>,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port: u16 = parsed("SERVER_PORT", "8000")?;
        let public_base_url = optional("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_minutes: parsed("JWT_EXPIRY_MINUTES", "60")?,
            jwt_refresh_expiry_hours: parsed("JWT_REFRESH_EXPIRY_HOURS", "24")?,
            tax_year: env::var("TAX_YEAR").unwrap_or_else(|_| "2025".to_string()),
            tax_schedule_path: optional("TAX_SCHEDULE_PATH").map(PathBuf::from),
            media_root: PathBuf::from(
                env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()),
            ),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", "5242880")?,
            admin_username: optional("ADMIN_USERNAME"),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            admin_password: optional("ADMIN_PASSWORD"),
            server_host,
            server_port,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn download_url(&self, zip_id: uuid::Uuid) -> String {
        format!("{}/api/v1/exports/{}/download", self.public_base_url, zip_id)
    }
}

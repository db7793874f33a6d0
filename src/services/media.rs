// src/services/media.rs

//! Files kept on disk under `MEDIA_ROOT`: raw P9 uploads and generated ZIP
//! bundles. Each file gets a database row pointing at it.

use sqlx::{PgExecutor, PgPool};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{P9Form, TaxRecord, TaxZip},
    services::tax_record::{NewTaxRecord, insert_tax_record},
};

/// Last path component of a client-supplied name, restricted to a safe
/// character set.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "p9.csv".to_string()
    } else {
        cleaned
    }
}

async fn write_file(dir: PathBuf, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
    fs::create_dir_all(&dir).await?;
    let path = dir.join(file_name);
    fs::write(&path, bytes).await?;
    Ok(path)
}

async fn insert_p9<'e, E>(
    executor: E,
    id: Uuid,
    user_id: Uuid,
    path: &Path,
    file_name: &str,
) -> AppResult<P9Form>
where
    E: PgExecutor<'e>,
{
    let p9 = sqlx::query_as::<_, P9Form>(
        r#"INSERT INTO p9_forms (id, user_id, file_path, file_name, uploaded_at)
           VALUES ($1, $2, $3, $4, NOW())
           RETURNING *"#,
    )
    .bind(id)
    .bind(user_id)
    .bind(path.to_string_lossy().into_owned())
    .bind(file_name)
    .fetch_one(executor)
    .await?;
    Ok(p9)
}

/// Stores an uploaded P9 together with the tax record computed from it.
///
/// Both rows commit in one transaction. If either insert fails the file
/// written to disk is removed again, so a failed upload leaves nothing behind.
pub async fn save_p9(
    db: &PgPool,
    media_root: &Path,
    original_name: &str,
    bytes: &[u8],
    record: NewTaxRecord,
) -> AppResult<(P9Form, TaxRecord)> {
    let id = Uuid::new_v4();
    let file_name = sanitize_file_name(original_name);
    let path = write_file(
        media_root.join("p9_uploads"),
        &format!("{}_{}", id, file_name),
        bytes,
    )
    .await?;

    let persisted = async {
        let mut tx = db.begin().await?;
        let p9 = insert_p9(&mut *tx, id, record.user_id, &path, &file_name).await?;
        let tax_record = insert_tax_record(&mut *tx, &record).await?;
        tx.commit().await?;
        Ok::<_, AppError>((p9, tax_record))
    }
    .await;

    match persisted {
        Ok((p9, tax_record)) => {
            info!(
                "P9 {} stored for user {} at {}; tax record {}: year {}, gross {}, PAYE {}",
                p9.id,
                p9.user_id,
                path.display(),
                tax_record.id,
                tax_record.year,
                tax_record.gross_income,
                tax_record.computed_paye
            );
            Ok((p9, tax_record))
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&path).await {
                warn!("Could not remove orphaned upload {}: {}", path.display(), rm);
            }
            Err(e)
        }
    }
}

pub async fn save_archive(
    db: &PgPool,
    media_root: &Path,
    owner_id: Uuid,
    file_name: &str,
    bytes: &[u8],
) -> AppResult<TaxZip> {
    let path = write_file(
        media_root
            .join("zip_exports")
            .join(format!("user_{}", owner_id)),
        file_name,
        bytes,
    )
    .await?;

    let zip = sqlx::query_as::<_, TaxZip>(
        r#"INSERT INTO tax_zips (id, user_id, file_path, file_name, created_at)
           VALUES ($1, $2, $3, $4, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(path.to_string_lossy().into_owned())
    .bind(file_name)
    .fetch_one(db)
    .await?;

    info!("Export {} stored for user {} ({} bytes)", zip.id, owner_id, bytes.len());
    Ok(zip)
}

pub async fn read_archive(zip: &TaxZip) -> AppResult<Vec<u8>> {
    Ok(fs::read(&zip.file_path).await?)
}

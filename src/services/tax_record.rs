// src/services/tax_record.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::{errors::AppResult, models::TaxRecord, services::paye::PayeBreakdown};

/// A computed result ready to be persisted. Taxable income always equals
/// gross income.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTaxRecord {
    pub user_id: Uuid,
    pub year: String,
    pub gross_income: Decimal,
    pub taxable_income: Decimal,
    pub computed_paye: Decimal,
}

impl NewTaxRecord {
    pub fn from_breakdown(user_id: Uuid, breakdown: &PayeBreakdown) -> Self {
        Self {
            user_id,
            year: breakdown.tax_year.clone(),
            gross_income: breakdown.gross_income,
            taxable_income: breakdown.gross_income,
            computed_paye: breakdown.computed_paye,
        }
    }
}

#[async_trait]
pub trait TaxRecordStore: Send + Sync {
    /// Stores the whole record or nothing.
    async fn append(&self, record: NewTaxRecord) -> AppResult<TaxRecord>;

    /// Records owned by `user_id`, oldest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<TaxRecord>>;
}

pub struct PgTaxRecordStore {
    db: PgPool,
}

impl PgTaxRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Single-statement insert, usable on the pool or inside a transaction.
pub async fn insert_tax_record<'e, E>(executor: E, record: &NewTaxRecord) -> AppResult<TaxRecord>
where
    E: PgExecutor<'e>,
{
    let stored = sqlx::query_as::<_, TaxRecord>(
        r#"INSERT INTO tax_records (id, user_id, year, gross_income, taxable_income, computed_paye, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(record.user_id)
    .bind(&record.year)
    .bind(record.gross_income)
    .bind(record.taxable_income)
    .bind(record.computed_paye)
    .fetch_one(executor)
    .await?;

    Ok(stored)
}

#[async_trait]
impl TaxRecordStore for PgTaxRecordStore {
    async fn append(&self, record: NewTaxRecord) -> AppResult<TaxRecord> {
        insert_tax_record(&self.db, &record).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<TaxRecord>> {
        let records = sqlx::query_as::<_, TaxRecord>(
            "SELECT * FROM tax_records WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}

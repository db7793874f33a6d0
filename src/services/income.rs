// src/services/income.rs

//! P9 ingestion: decoding uploaded CSV into rows and reducing them to a
//! single gross income figure.
//!
//! Ingestion is lenient. A row whose `Basic Salary` or `Benefits` cell does
//! not parse as a non-negative decimal is dropped whole; it never aborts the
//! upload. So is a row that would push the total past `Decimal::MAX`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{collections::HashMap, str::FromStr};
use thiserror::Error;
use tracing::debug;

use crate::services::paye::round_half_up;

pub const BASIC_SALARY: &str = "Basic Salary";
pub const BENEFITS: &str = "Benefits";

/// Largest amount the `NUMERIC(12, 2)` income columns can hold.
pub const MAX_STORED_AMOUNT: Decimal = dec!(9999999999.99);

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("uploaded file is not valid UTF-8")]
    NotUtf8,

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("gross income {0} exceeds the largest storable amount {MAX_STORED_AMOUNT}")]
    AmountTooLarge(Decimal),
}

/// One record of a P9 statement, keyed by column header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomeRow {
    fields: HashMap<String, String>,
}

impl IncomeRow {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// `salary + benefits`, or `None` when either present cell is unusable
    /// or the sum overflows.
    fn gross(&self) -> Option<Decimal> {
        let salary = parse_amount(self.get(BASIC_SALARY))?;
        let benefits = parse_amount(self.get(BENEFITS))?;
        salary.checked_add(benefits)
    }
}

impl<K, V> FromIterator<(K, V)> for IncomeRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Absent cells count as zero; present cells must be a non-negative decimal.
fn parse_amount(cell: Option<&str>) -> Option<Decimal> {
    let Some(raw) = cell else {
        return Some(Decimal::ZERO);
    };
    let raw = raw.trim();
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()?;
    (value >= Decimal::ZERO).then_some(value)
}

/// Sums `salary + benefits` across every usable row, rounded half-up to
/// cents so the stored gross is exactly the figure PAYE is computed from.
pub fn aggregate_gross_income<'a, I>(rows: I) -> Decimal
where
    I: IntoIterator<Item = &'a IncomeRow>,
{
    let total = rows
        .into_iter()
        .enumerate()
        .fold(Decimal::ZERO, |total, (index, row)| {
            let Some(gross) = row.gross() else {
                debug!("Skipping P9 row {}: non-numeric salary or benefits", index + 1);
                return total;
            };
            match total.checked_add(gross) {
                Some(sum) => sum,
                None => {
                    debug!("Skipping P9 row {}: total would overflow", index + 1);
                    total
                }
            }
        });

    round_half_up(total)
}

/// Rejects a gross income too large to persist.
pub fn ensure_storable(gross_income: Decimal) -> Result<Decimal, IngestError> {
    if gross_income > MAX_STORED_AMOUNT {
        return Err(IngestError::AmountTooLarge(gross_income));
    }
    Ok(gross_income)
}

/// Decodes an uploaded CSV (with header row) into rows.
///
/// Cells missing from a short row are recorded as empty, so the row is
/// skipped during aggregation rather than treated as zero.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<IncomeRow>, IngestError> {
    let text = std::str::from_utf8(bytes).map_err(|_| IngestError::NotUtf8)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: IncomeRow = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header, record.get(i).unwrap_or("")))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

// src/services/paye.rs

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::schedule::TaxSchedule;

#[derive(Debug, Error, PartialEq)]
pub enum TaxError {
    #[error("Invalid income: {0} (income must not be negative)")]
    InvalidIncome(Decimal),

    #[error("No tax schedule configured for year {0}")]
    UnknownTaxYear(String),
}

/// Statutory contributions derived from gross income.
///
/// These are reported with every computation but are not subtracted from
/// either the income base or the tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatutoryFigures {
    pub shif: Decimal,
    pub nssf: Decimal,
    pub housing_levy: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PayeBreakdown {
    pub tax_year: String,
    pub gross_income: Decimal,
    pub taxable_income: Decimal,
    pub band_tax: Decimal,
    pub personal_relief: Decimal,
    pub statutory: Option<StatutoryFigures>,
    pub computed_paye: Decimal,
}

/// Rounds to two decimal places, midpoint away from zero.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes PAYE on `gross_income` under `schedule`.
///
/// Taxable income is the gross income itself. Personal relief is the only
/// adjustment applied to the band tax; the result is clamped at zero and
/// rounded half-up to cents.
pub fn compute_paye(schedule: &TaxSchedule, gross_income: Decimal) -> Result<PayeBreakdown, TaxError> {
    let taxable_income = gross_income;
    let band_tax = schedule.band_tax(taxable_income)?;
    let personal_relief = schedule.personal_relief();

    let statutory = schedule.statutory().map(|rates| StatutoryFigures {
        shif: round_half_up((gross_income * rates.shif_rate).max(rates.shif_minimum)),
        nssf: rates.nssf_contribution,
        housing_levy: round_half_up(gross_income * rates.housing_levy_rate),
    });

    let computed_paye = round_half_up((band_tax - personal_relief).max(Decimal::ZERO));

    Ok(PayeBreakdown {
        tax_year: schedule.tax_year().to_string(),
        gross_income,
        taxable_income,
        band_tax: round_half_up(band_tax),
        personal_relief,
        statutory,
        computed_paye,
    })
}

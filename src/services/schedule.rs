// src/services/schedule.rs

//! PAYE band schedules, keyed by tax year.
//!
//! A schedule is validated once when it is built. Everything downstream
//! (band application, relief, statutory figures) can then assume strictly
//! increasing limits and an unbounded terminal band.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path, sync::Arc};
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use super::paye::TaxError;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("schedule {year}: no bands defined")]
    Empty { year: String },

    #[error("schedule {year}: band {index} rate {rate} is outside [0, 1]")]
    RateOutOfRange {
        year: String,
        index: usize,
        rate: Decimal,
    },

    #[error("schedule {year}: band {index} limit {limit} must be positive")]
    NonPositiveLimit {
        year: String,
        index: usize,
        limit: Decimal,
    },

    #[error("schedule {year}: band {index} limit {limit} does not exceed previous limit {previous}")]
    NonIncreasingLimit {
        year: String,
        index: usize,
        limit: Decimal,
        previous: Decimal,
    },

    #[error("schedule {year}: band {index} is unbounded but is not the last band")]
    UnboundedBeforeEnd { year: String, index: usize },

    #[error("schedule {year}: last band must be unbounded")]
    BoundedTerminalBand { year: String },

    #[error("schedule {year}: {field} must not be negative")]
    NegativeAmount { year: String, field: &'static str },

    #[error("schedule {year} is defined more than once")]
    DuplicateYear { year: String },

    #[error("failed to read schedule file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse schedule file '{path}': {message}")]
    Parse { path: String, message: String },
}

/// One slice of a progressive schedule. `upper_limit` is inclusive; `None`
/// marks the unbounded terminal band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaxBand {
    pub upper_limit: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBand {
    pub const fn bounded(upper_limit: Decimal, rate: Decimal) -> Self {
        Self {
            upper_limit: Some(upper_limit),
            rate,
        }
    }

    pub const fn unbounded(rate: Decimal) -> Self {
        Self {
            upper_limit: None,
            rate,
        }
    }
}

/// Statutory contributions reported alongside PAYE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatutoryRates {
    /// Health levy as a fraction of gross income, e.g. 0.0275
    pub shif_rate: Decimal,
    /// Floor applied to the health levy
    pub shif_minimum: Decimal,
    /// Fixed pension contribution
    pub nssf_contribution: Decimal,
    /// Housing levy as a fraction of gross income, e.g. 0.015
    pub housing_levy_rate: Decimal,
}

/// On-disk shape of a schedule, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDefinition {
    pub tax_year: String,
    pub bands: Vec<TaxBand>,
    #[serde(default)]
    pub personal_relief: Decimal,
    #[serde(default)]
    pub statutory: Option<StatutoryRates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TaxSchedule {
    tax_year: String,
    bands: Vec<TaxBand>,
    personal_relief: Decimal,
    statutory: Option<StatutoryRates>,
}

impl TaxSchedule {
    pub fn new(
        tax_year: impl Into<String>,
        bands: Vec<TaxBand>,
        personal_relief: Decimal,
        statutory: Option<StatutoryRates>,
    ) -> Result<Self, ScheduleError> {
        let schedule = Self {
            tax_year: tax_year.into(),
            bands,
            personal_relief,
            statutory,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Legacy three-band schedule with no relief.
    pub fn kenya_2024() -> Self {
        Self {
            tax_year: "2024".to_string(),
            bands: vec![
                TaxBand::bounded(dec!(24000), dec!(0.10)),
                TaxBand::bounded(dec!(32333), dec!(0.25)),
                TaxBand::unbounded(dec!(0.30)),
            ],
            personal_relief: Decimal::ZERO,
            statutory: None,
        }
    }

    /// Current five-band schedule.
    pub fn kenya_2025() -> Self {
        Self {
            tax_year: "2025".to_string(),
            bands: vec![
                TaxBand::bounded(dec!(24000), dec!(0.10)),
                TaxBand::bounded(dec!(32333), dec!(0.25)),
                TaxBand::bounded(dec!(500000), dec!(0.30)),
                TaxBand::bounded(dec!(800000), dec!(0.325)),
                TaxBand::unbounded(dec!(0.35)),
            ],
            personal_relief: dec!(2400),
            statutory: Some(StatutoryRates {
                shif_rate: dec!(0.0275),
                shif_minimum: dec!(300),
                nssf_contribution: dec!(2160),
                housing_levy_rate: dec!(0.015),
            }),
        }
    }

    pub fn tax_year(&self) -> &str {
        &self.tax_year
    }

    pub fn bands(&self) -> &[TaxBand] {
        &self.bands
    }

    pub fn personal_relief(&self) -> Decimal {
        self.personal_relief
    }

    pub fn statutory(&self) -> Option<&StatutoryRates> {
        self.statutory.as_ref()
    }

    /// Progressive marginal tax over the bands, before relief.
    ///
    /// Income equal to a band limit is taxed at that band's rate.
    pub fn band_tax(&self, income: Decimal) -> Result<Decimal, TaxError> {
        if income < Decimal::ZERO {
            return Err(TaxError::InvalidIncome(income));
        }

        let mut prev = Decimal::ZERO;
        let mut tax = Decimal::ZERO;

        for band in &self.bands {
            match band.upper_limit {
                Some(limit) if income > limit => {
                    tax += (limit - prev) * band.rate;
                    prev = limit;
                }
                _ => {
                    tax += (income - prev) * band.rate;
                    break;
                }
            }
        }

        Ok(tax)
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        let year = || self.tax_year.clone();

        if self.bands.is_empty() {
            return Err(ScheduleError::Empty { year: year() });
        }
        if self.personal_relief < Decimal::ZERO {
            return Err(ScheduleError::NegativeAmount {
                year: year(),
                field: "personal_relief",
            });
        }
        if let Some(rates) = &self.statutory {
            let fields = [
                ("shif_rate", rates.shif_rate),
                ("shif_minimum", rates.shif_minimum),
                ("nssf_contribution", rates.nssf_contribution),
                ("housing_levy_rate", rates.housing_levy_rate),
            ];
            for (field, value) in fields {
                if value < Decimal::ZERO {
                    return Err(ScheduleError::NegativeAmount { year: year(), field });
                }
            }
        }

        let last = self.bands.len() - 1;
        let mut previous = Decimal::ZERO;

        for (index, band) in self.bands.iter().enumerate() {
            if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
                return Err(ScheduleError::RateOutOfRange {
                    year: year(),
                    index,
                    rate: band.rate,
                });
            }

            match band.upper_limit {
                Some(_) if index == last => {
                    return Err(ScheduleError::BoundedTerminalBand { year: year() });
                }
                Some(limit) if limit <= Decimal::ZERO => {
                    return Err(ScheduleError::NonPositiveLimit {
                        year: year(),
                        index,
                        limit,
                    });
                }
                Some(limit) if index > 0 && limit <= previous => {
                    return Err(ScheduleError::NonIncreasingLimit {
                        year: year(),
                        index,
                        limit,
                        previous,
                    });
                }
                Some(limit) => previous = limit,
                None if index != last => {
                    return Err(ScheduleError::UnboundedBeforeEnd { year: year(), index });
                }
                None => {}
            }
        }

        Ok(())
    }
}

impl TryFrom<ScheduleDefinition> for TaxSchedule {
    type Error = ScheduleError;

    fn try_from(def: ScheduleDefinition) -> Result<Self, Self::Error> {
        TaxSchedule::new(def.tax_year, def.bands, def.personal_relief, def.statutory)
    }
}

/// All schedules the service knows about, looked up by year label.
#[derive(Debug, Clone)]
pub struct ScheduleRegistry {
    schedules: BTreeMap<String, Arc<TaxSchedule>>,
}

impl ScheduleRegistry {
    pub fn builtin() -> Self {
        let mut schedules = BTreeMap::new();
        for schedule in [TaxSchedule::kenya_2024(), TaxSchedule::kenya_2025()] {
            schedules.insert(schedule.tax_year.clone(), Arc::new(schedule));
        }
        Self { schedules }
    }

    /// Built-in schedules, overridden or extended by the JSON file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self, ScheduleError> {
        let mut registry = Self::builtin();

        let Some(path) = path else {
            info!("Using built-in tax schedules: {:?}", registry.years());
            return Ok(registry);
        };

        let raw = fs::read_to_string(path).map_err(|e| ScheduleError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let overrides = Self::parse(&raw).map_err(|e| match e {
            ScheduleError::Parse { message, .. } => ScheduleError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;

        for schedule in overrides {
            info!(
                "Loaded tax schedule {} ({} bands) from {}",
                schedule.tax_year,
                schedule.bands.len(),
                path.display()
            );
            registry
                .schedules
                .insert(schedule.tax_year.clone(), Arc::new(schedule));
        }

        Ok(registry)
    }

    /// Parses and validates a JSON array of schedule definitions.
    pub fn parse(raw: &str) -> Result<Vec<TaxSchedule>, ScheduleError> {
        let definitions: Vec<ScheduleDefinition> =
            serde_json::from_str(raw).map_err(|e| ScheduleError::Parse {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;

        let mut seen = std::collections::BTreeSet::new();
        let mut schedules = Vec::with_capacity(definitions.len());
        for def in definitions {
            if !seen.insert(def.tax_year.clone()) {
                return Err(ScheduleError::DuplicateYear { year: def.tax_year });
            }
            schedules.push(TaxSchedule::try_from(def)?);
        }
        Ok(schedules)
    }

    pub fn get(&self, tax_year: &str) -> Result<Arc<TaxSchedule>, TaxError> {
        self.schedules
            .get(tax_year)
            .cloned()
            .ok_or_else(|| TaxError::UnknownTaxYear(tax_year.to_string()))
    }

    pub fn years(&self) -> Vec<&str> {
        self.schedules.keys().map(String::as_str).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &TaxSchedule> {
        self.schedules.values().map(Arc::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::{prop_assert, proptest};

    use super::*;

    fn cents(value: u64) -> Decimal {
        Decimal::new(value as i64, 2)
    }

    #[test]
    fn builtin_schedules_are_valid() {
        assert!(TaxSchedule::kenya_2024().validate().is_ok());
        assert!(TaxSchedule::kenya_2025().validate().is_ok());
    }

    #[test]
    fn band_tax_of_zero_is_zero() {
        let schedule = TaxSchedule::kenya_2025();

        assert_eq!(schedule.band_tax(Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn band_tax_within_first_band() {
        let schedule = TaxSchedule::kenya_2025();

        assert_eq!(schedule.band_tax(dec!(20000)).unwrap(), dec!(2000));
    }

    #[test]
    fn band_tax_for_one_million() {
        let schedule = TaxSchedule::kenya_2025();

        // 2400 + 2083.25 + 140300.10 + 97500 + 70000
        assert_eq!(schedule.band_tax(dec!(1000000)).unwrap(), dec!(312283.35));
    }

    #[test]
    fn income_on_a_limit_uses_that_bands_rate() {
        let schedule = TaxSchedule::kenya_2025();

        assert_eq!(schedule.band_tax(dec!(24000)).unwrap(), dec!(2400));
        assert_eq!(schedule.band_tax(dec!(32333)).unwrap(), dec!(4483.25));
        assert_eq!(schedule.band_tax(dec!(24000.01)).unwrap(), dec!(2400.0025));
    }

    #[test]
    fn legacy_schedule_matches_three_band_formula() {
        let schedule = TaxSchedule::kenya_2024();

        assert_eq!(schedule.band_tax(dec!(50000)).unwrap(), dec!(9783.35));
    }

    #[test]
    fn negative_income_is_rejected() {
        let schedule = TaxSchedule::kenya_2025();

        assert_eq!(
            schedule.band_tax(dec!(-1)),
            Err(TaxError::InvalidIncome(dec!(-1)))
        );
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let err = TaxSchedule::new("2030", vec![], Decimal::ZERO, None).unwrap_err();

        assert_eq!(err, ScheduleError::Empty { year: "2030".into() });
    }

    #[test]
    fn bounded_terminal_band_is_rejected() {
        let err = TaxSchedule::new(
            "2030",
            vec![
                TaxBand::bounded(dec!(1000), dec!(0.1)),
                TaxBand::bounded(dec!(2000), dec!(0.2)),
            ],
            Decimal::ZERO,
            None,
        )
        .unwrap_err();

        assert_eq!(err, ScheduleError::BoundedTerminalBand { year: "2030".into() });
    }

    #[test]
    fn non_increasing_limits_are_rejected() {
        let err = TaxSchedule::new(
            "2030",
            vec![
                TaxBand::bounded(dec!(2000), dec!(0.1)),
                TaxBand::bounded(dec!(2000), dec!(0.2)),
                TaxBand::unbounded(dec!(0.3)),
            ],
            Decimal::ZERO,
            None,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ScheduleError::NonIncreasingLimit { index: 1, .. }
        ));
    }

    #[test]
    fn unbounded_band_in_the_middle_is_rejected() {
        let err = TaxSchedule::new(
            "2030",
            vec![
                TaxBand::bounded(dec!(1000), dec!(0.1)),
                TaxBand::unbounded(dec!(0.2)),
                TaxBand::unbounded(dec!(0.3)),
            ],
            Decimal::ZERO,
            None,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ScheduleError::UnboundedBeforeEnd {
                year: "2030".into(),
                index: 1
            }
        );
    }

    #[test]
    fn rate_above_one_is_rejected() {
        let err = TaxSchedule::new(
            "2030",
            vec![TaxBand::unbounded(dec!(1.5))],
            Decimal::ZERO,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ScheduleError::RateOutOfRange { index: 0, .. }));
    }

    #[test]
    fn negative_relief_is_rejected() {
        let err = TaxSchedule::new(
            "2030",
            vec![TaxBand::unbounded(dec!(0.1))],
            dec!(-1),
            None,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ScheduleError::NegativeAmount {
                year: "2030".into(),
                field: "personal_relief"
            }
        );
    }

    #[test]
    fn parse_reads_json_definitions() {
        let raw = r#"[
            {
                "tax_year": "2026",
                "bands": [
                    { "upper_limit": "30000", "rate": "0.1" },
                    { "upper_limit": null, "rate": "0.3" }
                ],
                "personal_relief": "2400"
            }
        ]"#;

        let schedules = ScheduleRegistry::parse(raw).unwrap();

        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].tax_year(), "2026");
        assert_eq!(schedules[0].bands().len(), 2);
        assert_eq!(schedules[0].personal_relief(), dec!(2400));
        assert_eq!(schedules[0].statutory(), None);
    }

    #[test]
    fn parse_rejects_duplicate_years() {
        let raw = r#"[
            { "tax_year": "2026", "bands": [{ "upper_limit": null, "rate": "0.1" }] },
            { "tax_year": "2026", "bands": [{ "upper_limit": null, "rate": "0.2" }] }
        ]"#;

        assert_eq!(
            ScheduleRegistry::parse(raw).unwrap_err(),
            ScheduleError::DuplicateYear { year: "2026".into() }
        );
    }

    #[test]
    fn parse_rejects_invalid_schedule() {
        let raw = r#"[
            { "tax_year": "2026", "bands": [{ "upper_limit": "100", "rate": "0.1" }] }
        ]"#;

        assert_eq!(
            ScheduleRegistry::parse(raw).unwrap_err(),
            ScheduleError::BoundedTerminalBand { year: "2026".into() }
        );
    }

    #[test]
    fn load_without_file_uses_builtins() {
        let registry = ScheduleRegistry::load(None).unwrap();

        assert_eq!(registry.years(), vec!["2024", "2025"]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ScheduleRegistry::load(Some(Path::new("/nonexistent/schedules.json")))
            .unwrap_err();

        assert!(matches!(err, ScheduleError::Read { .. }));
    }

    #[test]
    fn unknown_year_lookup_fails() {
        let registry = ScheduleRegistry::builtin();

        assert_eq!(
            registry.get("1999").unwrap_err(),
            TaxError::UnknownTaxYear("1999".into())
        );
    }

    proptest! {
        #[test]
        fn band_tax_is_non_negative_and_monotonic(a in 0u64..200_000_000, b in 0u64..200_000_000) {
            let schedule = TaxSchedule::kenya_2025();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };

            let low_tax = schedule.band_tax(cents(low)).unwrap();
            let high_tax = schedule.band_tax(cents(high)).unwrap();

            prop_assert!(low_tax >= Decimal::ZERO);
            prop_assert!(low_tax <= high_tax);
        }

        #[test]
        fn band_tax_is_continuous_at_limits(band in 0usize..4) {
            let schedule = TaxSchedule::kenya_2025();
            let limit = schedule.bands()[band].upper_limit.unwrap();

            let below = schedule.band_tax(limit - dec!(0.01)).unwrap();
            let at = schedule.band_tax(limit).unwrap();

            prop_assert!(at - below <= dec!(0.01));
        }
    }
}

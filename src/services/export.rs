// src/services/export.rs

//! Tax summary rendering and ZIP packaging.
//!
//! The summary is plain comma-joined text. Cells are written verbatim with no
//! quoting, so a comma inside a year label will shift columns for readers.

use chrono::{DateTime, NaiveDate, Utc};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::models::TaxRecord;

pub const SUMMARY_HEADER: &str = "Tax Year,Gross Income,Taxable Income,Computed PAYE";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Header line plus one line per record, in input order, `\n`-joined.
pub fn render_summary<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a TaxRecord>,
{
    let mut lines = vec![SUMMARY_HEADER.to_string()];
    lines.extend(records.into_iter().map(|r| {
        format!(
            "{},{},{},{}",
            r.year, r.gross_income, r.taxable_income, r.computed_paye
        )
    }));
    lines.join("\n")
}

pub fn summary_entry_name(date: NaiveDate) -> String {
    format!("Taxika_P9_Summary_{}.csv", date.format("%Y%m%d"))
}

pub fn archive_file_name(username: &str, at: DateTime<Utc>) -> String {
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("taxika_export_{}_{}.zip", safe, at.format("%Y%m%d_%H%M%S"))
}

/// Packs `contents` as a single deflated entry named `entry_name`.
pub fn build_archive(entry_name: &str, contents: &str) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(entry_name, options)?;
    writer.write_all(contents.as_bytes())?;

    Ok(writer.finish()?.into_inner())
}

/// Renders the summary for `records` and packages it, dated `at`.
pub fn export_records(records: &[TaxRecord], at: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let summary = render_summary(records);
    build_archive(&summary_entry_name(at.date_naive()), &summary)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::io::Read;
    use uuid::Uuid;
    use zip::ZipArchive;

    use super::*;

    fn record(year: &str, gross: rust_decimal::Decimal, paye: rust_decimal::Decimal) -> TaxRecord {
        TaxRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            year: year.to_string(),
            gross_income: gross,
            taxable_income: gross,
            computed_paye: paye,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn renders_header_and_records_without_trailing_newline() {
        let records = vec![record("2025", dec!(100000), dec!(9000))];

        assert_eq!(
            render_summary(&records),
            "Tax Year,Gross Income,Taxable Income,Computed PAYE\n2025,100000,100000,9000"
        );
    }

    #[test]
    fn keeps_input_order() {
        let records = vec![
            record("2025", dec!(1.50), dec!(0)),
            record("2024", dec!(20000.00), dec!(2000.00)),
        ];

        assert_eq!(
            render_summary(&records),
            "Tax Year,Gross Income,Taxable Income,Computed PAYE\n\
             2025,1.50,1.50,0\n\
             2024,20000.00,20000.00,2000.00"
        );
    }

    #[test]
    fn no_records_renders_header_only() {
        assert_eq!(render_summary(&Vec::<TaxRecord>::new()), SUMMARY_HEADER);
    }

    #[test]
    fn embedded_commas_are_not_escaped() {
        let records = vec![record("20,25", dec!(1), dec!(0))];

        assert_eq!(
            render_summary(&records).lines().nth(1),
            Some("20,25,1,1,0")
        );
    }

    #[test]
    fn file_names_follow_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();

        assert_eq!(summary_entry_name(at.date_naive()), "Taxika_P9_Summary_20250307.csv");
        assert_eq!(archive_file_name("jane.doe", at), "taxika_export_jane_doe_20250307_140509.zip");
    }

    #[test]
    fn archive_holds_single_deflated_summary() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();
        let records = vec![record("2025", dec!(100000), dec!(9000))];

        let bytes = export_records(&records, at).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "Taxika_P9_Summary_20250307.csv");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);

        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, render_summary(&records));
    }
}

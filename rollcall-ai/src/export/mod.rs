//! Export engine
//!
//! Three renderings of the same record set, all in canonical column order
//! with the canonical header labels:
//! - CSV text (`delimited::to_csv`)
//! - clipboard TSV text (`delimited::to_clipboard_text`)
//! - XLSX workbook bytes (`xlsx::to_xlsx`)
//!
//! Exports only read the record set.

pub mod delimited;
pub mod xlsx;

use chrono::NaiveDate;
use thiserror::Error;

pub use delimited::{to_clipboard_text, to_csv};
pub use xlsx::to_xlsx;

/// Export failure
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to build workbook archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloadable export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// `attendance_data_<YYYY-MM-DD>`
pub fn default_file_stem(date: NaiveDate) -> String {
    format!("attendance_data_{}", date.format("%Y-%m-%d"))
}

/// Strip path separators, quotes and control characters from a chosen name
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | '"'))
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}

/// Final download name: sanitized stem (or the default) plus extension
pub fn export_filename(requested: Option<&str>, format: ExportFormat, today: NaiveDate) -> String {
    let extension = format.extension();
    let stem = requested
        .map(sanitize_file_stem)
        .map(|stem| {
            let suffix = format!(".{}", extension);
            match stem.len().checked_sub(suffix.len()) {
                Some(cut) if stem.to_ascii_lowercase().ends_with(&suffix) => stem[..cut].to_string(),
                _ => stem,
            }
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| default_file_stem(today));

    format!("{}.{}", stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_default_filename_uses_date() {
        assert_eq!(export_filename(None, ExportFormat::Csv, day()), "attendance_data_2024-03-09.csv");
        assert_eq!(
            export_filename(Some("   "), ExportFormat::Xlsx, day()),
            "attendance_data_2024-03-09.xlsx"
        );
    }

    #[test]
    fn test_chosen_name_is_sanitized() {
        assert_eq!(
            export_filename(Some("../march\"roll\ncall"), ExportFormat::Csv, day()),
            "marchrollcall.csv"
        );
        assert_eq!(export_filename(Some("week 1"), ExportFormat::Xlsx, day()), "week 1.xlsx");
    }

    #[test]
    fn test_extension_not_doubled() {
        assert_eq!(export_filename(Some("report.CSV"), ExportFormat::Csv, day()), "report.csv");
        assert_eq!(export_filename(Some("report.csv"), ExportFormat::Xlsx, day()), "report.csv.xlsx");
    }
}

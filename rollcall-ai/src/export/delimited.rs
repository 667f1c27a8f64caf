//! CSV and clipboard (tab-separated) renderings

use crate::models::{AttendanceRecord, Column};

fn header_labels() -> impl Iterator<Item = &'static str> {
    Column::ALL.iter().map(|column| column.label())
}

fn quote_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// CSV text: every field quoted, quotes doubled, rows joined by `\n`
pub fn to_csv(records: &[AttendanceRecord]) -> String {
    let header = header_labels().map(quote_csv).collect::<Vec<_>>().join(",");
    std::iter::once(header)
        .chain(
            records
                .iter()
                .map(|record| record.values().map(quote_csv).collect::<Vec<_>>().join(",")),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

/// One clipboard cell: tabs and line breaks become spaces, then trimmed
fn clean_tsv(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Tab-separated text for pasting into a spreadsheet
pub fn to_clipboard_text(records: &[AttendanceRecord]) -> String {
    let header = header_labels().collect::<Vec<_>>().join("\t");
    std::iter::once(header)
        .chain(
            records
                .iter()
                .map(|record| record.values().map(clean_tsv).collect::<Vec<_>>().join("\t")),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ID\tFirst Name\tMiddle\tLast Name\tSex\tDisability?\tDisability Type\tAddress\tPhone\tEmail\tQualification\tEmployment Type\tEmployment Status";

    #[test]
    fn test_empty_record_set_is_header_only() {
        assert_eq!(to_clipboard_text(&[]), HEADER);
        let csv = to_csv(&[]);
        assert!(csv.starts_with("\"ID\",\"First Name\""));
        assert!(!csv.contains('\n'));
    }

    #[test]
    fn test_csv_quotes_and_doubles() {
        let record = AttendanceRecord {
            id: "1".to_string(),
            firstname: "Ada \"Ace\"".to_string(),
            home_address: "1 Main St, Lagos".to_string(),
            ..Default::default()
        };
        let csv = to_csv(&[record]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("\"1\",\"Ada \"\"Ace\"\"\",\"\",\"\""));
        assert!(row.contains("\"1 Main St, Lagos\""));
        assert_eq!(row.matches("\",\"").count(), 12);
    }

    #[test]
    fn test_clipboard_flattens_whitespace() {
        let record = AttendanceRecord {
            id: " 7 ".to_string(),
            home_address: "Line one\nLine\ttwo\r".to_string(),
            ..Default::default()
        };
        let text = to_clipboard_text(&[record]);
        let row: Vec<&str> = text.lines().nth(1).unwrap().split('\t').collect();

        assert_eq!(row.len(), 13);
        assert_eq!(row[0], "7");
        assert_eq!(row[7], "Line one Line two");
    }
}

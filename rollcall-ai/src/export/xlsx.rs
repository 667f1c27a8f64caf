//! XLSX workbook writer
//!
//! Writes a minimal SpreadsheetML package by hand: one `Attendance` sheet
//! with inline-string cells, a styled header row, list validations on the
//! choice columns and `mailto:`/`tel:` hyperlinks. Cell text is escaped with
//! `quick_xml` and the parts are stored in a deflated zip.

use super::ExportError;
use crate::models::{AttendanceRecord, Column};
use crate::services::table_editor::qualification_options;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SHEET_NAME: &str = "Attendance";

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const HYPERLINK_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Excel rejects list formulas longer than this
const MAX_LIST_FORMULA_LEN: usize = 255;

/// Cell style indexes into `cellXfs`
const STYLE_HEADER: u8 = 1;
const STYLE_LINK: u8 = 2;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="3"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font><font><b/><sz val="11"/><color rgb="FFFFFFFF"/><name val="Calibri"/><family val="2"/></font><font><u/><sz val="11"/><color rgb="FF818CF8"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FF4F46E5"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/><xf numFmtId="0" fontId="2" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Column letter for a zero-based index (13 columns, so A..M)
fn column_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

fn cell_ref(column: Column, row: usize) -> String {
    format!("{}{}", column_letter(column.index()), row)
}

/// Drop characters XML 1.0 cannot carry
fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

fn column_width(column: Column) -> u8 {
    match column {
        Column::Id => 5,
        Column::HomeAddress => 40,
        Column::Email | Column::DisabilityType | Column::HighestQualification => 25,
        _ => 15,
    }
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

fn workbook_rels_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#
    )
}

fn root_rels_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

/// External hyperlink attached to one cell
#[derive(Debug, Clone, PartialEq, Eq)]
struct Hyperlink {
    cell: String,
    target: String,
    tooltip: &'static str,
}

fn hyperlink_for(column: Column, value: &str, row: usize) -> Option<Hyperlink> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (scheme, tooltip) = match column {
        Column::Email => ("mailto:", "Click to email"),
        Column::PhoneNo => ("tel:", "Click to call"),
        _ => return None,
    };
    Some(Hyperlink {
        cell: cell_ref(column, row),
        target: format!("{}{}", scheme, value),
        tooltip,
    })
}

/// Quoted, comma-separated list formula body, or `None` if nothing fits
fn list_formula(values: &[String]) -> Option<String> {
    let mut joined = String::new();
    for value in values {
        let item = value.replace('"', "\"\"");
        let extra = if joined.is_empty() { item.len() } else { item.len() + 1 };
        // +2 for the surrounding quotes
        if joined.len() + extra + 2 > MAX_LIST_FORMULA_LEN {
            warn!(kept = joined.split(',').count(), total = values.len(), "List validation truncated");
            break;
        }
        if !joined.is_empty() {
            joined.push(',');
        }
        joined.push_str(&item);
    }
    (!joined.is_empty()).then(|| format!("\"{}\"", joined))
}

fn data_validations(records: &[AttendanceRecord]) -> Vec<(Column, String)> {
    if records.is_empty() {
        return Vec::new();
    }
    let fixed = |values: &[&str]| list_formula(&values.iter().map(|v| v.to_string()).collect::<Vec<_>>());

    [
        (Column::Sex, fixed(&["M", "F"])),
        (Column::Disability, fixed(&["Yes", "No"])),
        (Column::EmploymentStatus, fixed(&["Employed", "Unemployed", "Self-Employed"])),
        (Column::HighestQualification, list_formula(&qualification_options(records))),
    ]
    .into_iter()
    .filter_map(|(column, formula)| formula.map(|f| (column, f)))
    .collect()
}

fn push_cell(xml: &mut String, reference: &str, value: &str, style: Option<u8>) {
    let value = xml_safe(value);
    if value.is_empty() {
        if let Some(style) = style {
            let _ = write!(xml, r#"<c r="{}" s="{}"/>"#, reference, style);
        }
        return;
    }
    let _ = write!(xml, r#"<c r="{}" t="inlineStr""#, reference);
    if let Some(style) = style {
        let _ = write!(xml, r#" s="{}""#, style);
    }
    let _ = write!(xml, r#"><is><t xml:space="preserve">{}</t></is></c>"#, escape(value.as_str()));
}

/// Worksheet XML plus the hyperlinks that need sheet relationships
fn sheet_xml(records: &[AttendanceRecord]) -> (String, Vec<Hyperlink>) {
    let last_row = records.len() + 1;
    let mut xml = String::with_capacity(512 + records.len() * 512);
    let mut links = Vec::new();

    let _ = write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><dimension ref="A1:{}{}"/><sheetFormatPr defaultRowHeight="15"/><cols>"#,
        column_letter(Column::ALL.len() - 1),
        last_row
    );
    for column in Column::ALL {
        let n = column.index() + 1;
        let _ = write!(
            xml,
            r#"<col min="{n}" max="{n}" width="{}" customWidth="1"/>"#,
            column_width(column)
        );
    }
    xml.push_str("</cols><sheetData>");

    xml.push_str(r#"<row r="1">"#);
    for column in Column::ALL {
        push_cell(&mut xml, &cell_ref(column, 1), column.label(), Some(STYLE_HEADER));
    }
    xml.push_str("</row>");

    for (offset, record) in records.iter().enumerate() {
        let row = offset + 2;
        let _ = write!(xml, r#"<row r="{}">"#, row);
        for column in Column::ALL {
            let value = record.get(column);
            let link = hyperlink_for(column, value, row);
            let style = link.as_ref().map(|_| STYLE_LINK);
            push_cell(&mut xml, &cell_ref(column, row), value, style);
            links.extend(link);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    let validations = data_validations(records);
    if !validations.is_empty() {
        let _ = write!(xml, r#"<dataValidations count="{}">"#, validations.len());
        for (column, formula) in &validations {
            let letter = column_letter(column.index());
            let _ = write!(
                xml,
                r#"<dataValidation type="list" allowBlank="1" showErrorMessage="1" sqref="{letter}2:{letter}{last_row}"><formula1>{}</formula1></dataValidation>"#,
                escape(xml_safe(formula).as_str())
            );
        }
        xml.push_str("</dataValidations>");
    }

    if !links.is_empty() {
        xml.push_str("<hyperlinks>");
        for (i, link) in links.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<hyperlink ref="{}" r:id="rId{}" tooltip="{}"/>"#,
                link.cell,
                i + 1,
                link.tooltip
            );
        }
        xml.push_str("</hyperlinks>");
    }

    xml.push_str("</worksheet>");
    (xml, links)
}

fn sheet_rels_xml(links: &[Hyperlink]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PKG_REL_NS}">"#
    );
    for (i, link) in links.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="{HYPERLINK_REL}" Target="{}" TargetMode="External"/>"#,
            i + 1,
            escape(xml_safe(&link.target).as_str())
        );
    }
    xml.push_str("</Relationships>");
    xml
}

/// Render the record set as an XLSX workbook
pub fn to_xlsx(records: &[AttendanceRecord]) -> Result<Vec<u8>, ExportError> {
    let (sheet, links) = sheet_xml(records);

    let mut parts: Vec<(&str, String)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", root_rels_xml()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", workbook_rels_xml()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/worksheets/sheet1.xml", sheet),
    ];
    if !links.is_empty() {
        parts.push(("xl/worksheets/_rels/sheet1.xml.rels", sheet_rels_xml(&links)));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    let cursor = zip.finish()?;

    tracing::debug!(rows = records.len(), hyperlinks = links.len(), "XLSX workbook written");
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, email: &str, phone: &str, qualification: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            email: email.to_string(),
            phone_no: phone.to_string(),
            highest_qualification: qualification.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cell_refs() {
        assert_eq!(cell_ref(Column::Id, 1), "A1");
        assert_eq!(cell_ref(Column::Email, 3), "J3");
        assert_eq!(cell_ref(Column::EmploymentStatus, 10), "M10");
    }

    #[test]
    fn test_hyperlinks_only_for_non_empty_contacts() {
        let records = vec![record("1", "a@x.com", "", ""), record("2", "  ", "0803", "")];
        let (xml, links) = sheet_xml(&records);

        assert_eq!(
            links,
            vec![
                Hyperlink {
                    cell: "J2".to_string(),
                    target: "mailto:a@x.com".to_string(),
                    tooltip: "Click to email",
                },
                Hyperlink {
                    cell: "I3".to_string(),
                    target: "tel:0803".to_string(),
                    tooltip: "Click to call",
                },
            ]
        );
        assert!(xml.contains(r#"<hyperlink ref="J2" r:id="rId1" tooltip="Click to email"/>"#));
        assert!(xml.contains(r#"<c r="J2" t="inlineStr" s="2">"#));
    }

    #[test]
    fn test_validations_follow_data_rows() {
        let records = vec![record("1", "", "", "BSc"), record("2", "", "", "HND")];
        let (xml, _) = sheet_xml(&records);

        assert!(xml.contains(r#"sqref="E2:E3"><formula1>&quot;M,F&quot;</formula1>"#));
        assert!(xml.contains(r#"sqref="F2:F3""#));
        assert!(xml.contains(r#"sqref="M2:M3"><formula1>&quot;Employed,Unemployed,Self-Employed&quot;</formula1>"#));
        assert!(xml.contains(r#"sqref="K2:K3"><formula1>&quot;BSc,HND&quot;</formula1>"#));
        let validations_at = xml.find("<dataValidations").unwrap();
        assert!(xml.find("</sheetData>").unwrap() < validations_at);
    }

    #[test]
    fn test_no_validations_without_rows() {
        let (xml, links) = sheet_xml(&[]);
        assert!(!xml.contains("dataValidations"));
        assert!(links.is_empty());
        assert!(xml.contains(r#"<c r="A1" t="inlineStr" s="1">"#));
    }

    #[test]
    fn test_qualification_validation_skipped_when_empty() {
        let (xml, _) = sheet_xml(&[record("1", "", "", "")]);
        assert!(!xml.contains(r#"sqref="K2:K2""#));
        assert!(xml.contains(r#"sqref="E2:E2""#));
    }

    #[test]
    fn test_list_formula_truncates() {
        let values: Vec<String> = (0..100).map(|i| format!("Qualification {}", i)).collect();
        let formula = list_formula(&values).unwrap();
        assert!(formula.len() <= MAX_LIST_FORMULA_LEN);
        assert!(formula.starts_with("\"Qualification 0,"));
        assert_eq!(list_formula(&[]), None);
    }

    #[test]
    fn test_text_is_escaped_and_control_chars_dropped() {
        let mut r = record("1", "", "", "");
        r.firstname = "A&B <C>\u{0007}".to_string();
        let (xml, _) = sheet_xml(&[r]);
        assert!(xml.contains("A&amp;B &lt;C&gt;</t>"));
    }

    #[test]
    fn test_column_widths() {
        let (xml, _) = sheet_xml(&[]);
        assert!(xml.contains(r#"<col min="1" max="1" width="5" customWidth="1"/>"#));
        assert!(xml.contains(r#"<col min="8" max="8" width="40" customWidth="1"/>"#));
        assert!(xml.contains(r#"<col min="10" max="10" width="25" customWidth="1"/>"#));
        assert!(xml.contains(r#"<col min="2" max="2" width="15" customWidth="1"/>"#));
    }
}

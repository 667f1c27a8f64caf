//! Aggregate counts over the record set
//!
//! Recomputed on every request, never stored.

use crate::models::AttendanceRecord;
use serde::Serialize;

/// Summary counts shown above the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub total_attendees: usize,
    /// Records flagged with a disability ("persons with disability")
    pub total_pwds: usize,
    pub total_employed: usize,
    pub total_unemployed: usize,
    pub total_self_employed: usize,
}

fn field_is(value: &str, expected: &str) -> bool {
    value.trim().eq_ignore_ascii_case(expected)
}

/// Compute summary counts
///
/// Employment buckets read `employment_status`, which extraction leaves
/// empty; they stay at zero until someone fills the column in.
pub fn calculate_summary(records: &[AttendanceRecord]) -> SummaryView {
    records.iter().fold(
        SummaryView {
            total_attendees: records.len(),
            ..Default::default()
        },
        |mut summary, record| {
            if field_is(&record.do_you_have_any_disability, "yes") {
                summary.total_pwds += 1;
            }
            let status = &record.employment_status;
            if field_is(status, "employed") {
                summary.total_employed += 1;
            } else if field_is(status, "unemployed") {
                summary.total_unemployed += 1;
            } else if field_is(status, "self-employed") {
                summary.total_self_employed += 1;
            }
            summary
        },
    )
}

//! Cell editor for the record table
//!
//! One edit cursor for the whole table. Each column has a descriptor whose
//! kind decides how an edit behaves:
//! - `Text`: a draft is typed, then committed on blur or confirm and
//!   discarded on cancel.
//! - `Choice`: the edit commits on selection; blur without a selection
//!   discards it.
//! - `ReadOnly`: cannot be edited.
//!
//! Commits never mutate the record set in place; they produce a new one.

use crate::models::{AttendanceRecord, Column};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Editor operation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("No cell is being edited")]
    NoActiveEdit,

    #[error("No record with id '{0}'")]
    UnknownRecord(String),

    #[error("Column '{0}' is read-only")]
    ReadOnlyColumn(Column),

    #[error("'{value}' is not a valid choice for column '{column}'")]
    InvalidChoice { column: Column, value: String },

    #[error("Column '{0}' does not accept typed input")]
    NotTextColumn(Column),

    #[error("Column '{0}' is not a choice column")]
    NotChoiceColumn(Column),
}

/// One selectable value of a choice column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }

    fn plain(value: &str) -> Self {
        Self::new(value, value)
    }
}

/// How a column is edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum EditorKind {
    Text,
    Choice(Vec<ChoiceOption>),
    ReadOnly,
}

impl EditorKind {
    fn accepts(&self, value: &str) -> bool {
        match self {
            EditorKind::Choice(options) => options.iter().any(|o| o.value == value),
            _ => false,
        }
    }
}

/// Column metadata for the table view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub column: Column,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: EditorKind,
}

/// Distinct non-empty qualification values, in order of first appearance
pub fn qualification_options(records: &[AttendanceRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        let value = record.highest_qualification.as_str();
        if !value.is_empty() && !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

/// Descriptor for one column given the current record set
pub fn descriptor_for(column: Column, records: &[AttendanceRecord]) -> ColumnDescriptor {
    let kind = match column {
        Column::Id => EditorKind::ReadOnly,
        Column::Sex => EditorKind::Choice(vec![
            ChoiceOption::new("M", "Male"),
            ChoiceOption::new("F", "Female"),
        ]),
        Column::Disability => {
            EditorKind::Choice(vec![ChoiceOption::plain("Yes"), ChoiceOption::plain("No")])
        }
        Column::HighestQualification => EditorKind::Choice(
            qualification_options(records)
                .iter()
                .map(|q| ChoiceOption::plain(q))
                .collect(),
        ),
        Column::EmploymentStatus => EditorKind::Choice(vec![
            ChoiceOption::new("", "Select..."),
            ChoiceOption::plain("Employed"),
            ChoiceOption::plain("Unemployed"),
            ChoiceOption::plain("Self-Employed"),
        ]),
        _ => EditorKind::Text,
    };

    ColumnDescriptor {
        column,
        label: column.label(),
        kind,
    }
}

/// Descriptors for every column, in canonical order
pub fn column_descriptors(records: &[AttendanceRecord]) -> Vec<ColumnDescriptor> {
    Column::ALL
        .iter()
        .map(|column| descriptor_for(*column, records))
        .collect()
}

/// New record set with one field replaced
///
/// Rows are matched by record id; every row carrying that id is updated.
pub fn apply_edit(
    records: &[AttendanceRecord],
    record_id: &str,
    column: Column,
    value: &str,
) -> Result<Vec<AttendanceRecord>, EditError> {
    if column == Column::Id {
        return Err(EditError::ReadOnlyColumn(column));
    }
    if !records.iter().any(|r| r.id == record_id) {
        return Err(EditError::UnknownRecord(record_id.to_string()));
    }

    Ok(records
        .iter()
        .map(|record| {
            if record.id == record_id {
                record.with_field(column, value)
            } else {
                record.clone()
            }
        })
        .collect())
}

/// A committed edit and the record set it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub record_id: String,
    pub column: Column,
    pub value: String,
    pub records: Vec<AttendanceRecord>,
}

/// The cell currently being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditCursor {
    pub record_id: String,
    pub column: Column,
    /// Typed value for text cells; `None` for choice cells
    pub draft: Option<String>,
    #[serde(skip)]
    kind: EditorKind,
}

impl EditCursor {
    fn is_at(&self, record_id: &str, column: Column) -> bool {
        self.record_id == record_id && self.column == column
    }
}

/// Single-cursor table editor
#[derive(Debug, Clone, Default)]
pub struct TableEditor {
    cursor: Option<EditCursor>,
}

impl TableEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Option<&EditCursor> {
        self.cursor.as_ref()
    }

    /// Drop the cursor without committing anything
    pub fn clear(&mut self) {
        self.cursor = None;
    }

    /// Start editing a cell
    ///
    /// If another cell is open it is blurred first, which may commit it; that
    /// commit is returned. Re-opening the current cell is a no-op.
    pub fn begin_edit(
        &mut self,
        records: &[AttendanceRecord],
        record_id: &str,
        column: Column,
    ) -> Result<Option<Commit>, EditError> {
        let record = records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| EditError::UnknownRecord(record_id.to_string()))?;

        if self.cursor.as_ref().is_some_and(|c| c.is_at(record_id, column)) {
            return Ok(None);
        }

        let descriptor = descriptor_for(column, records);
        if descriptor.kind == EditorKind::ReadOnly {
            return Err(EditError::ReadOnlyColumn(column));
        }

        let draft = match descriptor.kind {
            EditorKind::Text => Some(record.get(column).to_string()),
            _ => None,
        };
        let new_cursor = EditCursor {
            record_id: record_id.to_string(),
            column,
            draft,
            kind: descriptor.kind,
        };

        let blurred = self.blur(records)?;
        debug!(record_id = %record_id, column = %column, "Edit started");
        self.cursor = Some(new_cursor);
        Ok(blurred)
    }

    /// Replace the draft of the open text cell
    pub fn input(&mut self, value: impl Into<String>) -> Result<(), EditError> {
        let cursor = self.cursor.as_mut().ok_or(EditError::NoActiveEdit)?;
        match cursor.draft.as_mut() {
            Some(draft) => {
                *draft = value.into();
                Ok(())
            }
            None => Err(EditError::NotTextColumn(cursor.column)),
        }
    }

    /// Confirm the open text cell
    pub fn commit(&mut self, records: &[AttendanceRecord]) -> Result<Commit, EditError> {
        let cursor = self.cursor.as_ref().ok_or(EditError::NoActiveEdit)?;
        let draft = cursor
            .draft
            .clone()
            .ok_or(EditError::NotTextColumn(cursor.column))?;

        let commit = Self::commit_value(records, cursor, draft)?;
        self.cursor = None;
        Ok(commit)
    }

    /// Close the open cell without saving
    pub fn cancel(&mut self) -> Result<(), EditError> {
        self.cursor.take().map(|_| ()).ok_or(EditError::NoActiveEdit)
    }

    /// Pick a value in the open choice cell; commits immediately
    pub fn select(&mut self, records: &[AttendanceRecord], value: &str) -> Result<Commit, EditError> {
        let cursor = self.cursor.as_ref().ok_or(EditError::NoActiveEdit)?;
        if !matches!(cursor.kind, EditorKind::Choice(_)) {
            return Err(EditError::NotChoiceColumn(cursor.column));
        }
        if !cursor.kind.accepts(value) {
            return Err(EditError::InvalidChoice {
                column: cursor.column,
                value: value.to_string(),
            });
        }

        let commit = Self::commit_value(records, cursor, value.to_string())?;
        self.cursor = None;
        Ok(commit)
    }

    /// Leave the open cell: text commits its draft, choice discards
    pub fn blur(&mut self, records: &[AttendanceRecord]) -> Result<Option<Commit>, EditError> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };
        match cursor.draft.clone() {
            Some(draft) => Self::commit_value(records, &cursor, draft).map(Some),
            None => Ok(None),
        }
    }

    fn commit_value(
        records: &[AttendanceRecord],
        cursor: &EditCursor,
        value: String,
    ) -> Result<Commit, EditError> {
        let updated = apply_edit(records, &cursor.record_id, cursor.column, &value)?;
        debug!(record_id = %cursor.record_id, column = %cursor.column, "Edit committed");
        Ok(Commit {
            record_id: cursor.record_id.clone(),
            column: cursor.column,
            value,
            records: updated,
        })
    }
}

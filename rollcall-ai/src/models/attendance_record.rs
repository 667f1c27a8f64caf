//! Attendance record and the canonical column set
//!
//! The 13 columns below define the single ordering used by the table, the
//! editor and every export format.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One extracted attendance-sheet row
///
/// Every field is a plain string. Fields missing from a collaborator response
/// (or sent as `null`) become the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub firstname: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub middle: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lastname: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sex: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub do_you_have_any_disability: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub if_yes_type_of_disability: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub home_address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone_no: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub highest_qualification: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub employment_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub employment_status: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl AttendanceRecord {
    /// Read one field by column
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::Id => &self.id,
            Column::Firstname => &self.firstname,
            Column::Middle => &self.middle,
            Column::Lastname => &self.lastname,
            Column::Sex => &self.sex,
            Column::Disability => &self.do_you_have_any_disability,
            Column::DisabilityType => &self.if_yes_type_of_disability,
            Column::HomeAddress => &self.home_address,
            Column::PhoneNo => &self.phone_no,
            Column::Email => &self.email,
            Column::HighestQualification => &self.highest_qualification,
            Column::EmploymentType => &self.employment_type,
            Column::EmploymentStatus => &self.employment_status,
        }
    }

    /// Copy of this record with one field replaced
    pub fn with_field(&self, column: Column, value: impl Into<String>) -> Self {
        let mut updated = self.clone();
        let value = value.into();
        match column {
            Column::Id => updated.id = value,
            Column::Firstname => updated.firstname = value,
            Column::Middle => updated.middle = value,
            Column::Lastname => updated.lastname = value,
            Column::Sex => updated.sex = value,
            Column::Disability => updated.do_you_have_any_disability = value,
            Column::DisabilityType => updated.if_yes_type_of_disability = value,
            Column::HomeAddress => updated.home_address = value,
            Column::PhoneNo => updated.phone_no = value,
            Column::Email => updated.email = value,
            Column::HighestQualification => updated.highest_qualification = value,
            Column::EmploymentType => updated.employment_type = value,
            Column::EmploymentStatus => updated.employment_status = value,
        }
        updated
    }

    /// Field values in canonical column order
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        Column::ALL.iter().map(move |column| self.get(*column))
    }
}

/// Table column, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "firstname")]
    Firstname,
    #[serde(rename = "middle")]
    Middle,
    #[serde(rename = "lastname")]
    Lastname,
    #[serde(rename = "sex")]
    Sex,
    #[serde(rename = "do_you_have_any_disability")]
    Disability,
    #[serde(rename = "if_yes_type_of_disability")]
    DisabilityType,
    #[serde(rename = "home_address")]
    HomeAddress,
    #[serde(rename = "phone_no")]
    PhoneNo,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "highest_qualification")]
    HighestQualification,
    #[serde(rename = "employment_type")]
    EmploymentType,
    #[serde(rename = "employment_status")]
    EmploymentStatus,
}

impl Column {
    /// Canonical column order
    pub const ALL: [Column; 13] = [
        Column::Id,
        Column::Firstname,
        Column::Middle,
        Column::Lastname,
        Column::Sex,
        Column::Disability,
        Column::DisabilityType,
        Column::HomeAddress,
        Column::PhoneNo,
        Column::Email,
        Column::HighestQualification,
        Column::EmploymentType,
        Column::EmploymentStatus,
    ];

    /// Record field name (JSON key)
    pub fn key(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Firstname => "firstname",
            Column::Middle => "middle",
            Column::Lastname => "lastname",
            Column::Sex => "sex",
            Column::Disability => "do_you_have_any_disability",
            Column::DisabilityType => "if_yes_type_of_disability",
            Column::HomeAddress => "home_address",
            Column::PhoneNo => "phone_no",
            Column::Email => "email",
            Column::HighestQualification => "highest_qualification",
            Column::EmploymentType => "employment_type",
            Column::EmploymentStatus => "employment_status",
        }
    }

    /// Header label shown in the table and every export
    pub fn label(&self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Firstname => "First Name",
            Column::Middle => "Middle",
            Column::Lastname => "Last Name",
            Column::Sex => "Sex",
            Column::Disability => "Disability?",
            Column::DisabilityType => "Disability Type",
            Column::HomeAddress => "Address",
            Column::PhoneNo => "Phone",
            Column::Email => "Email",
            Column::HighestQualification => "Qualification",
            Column::EmploymentType => "Employment Type",
            Column::EmploymentStatus => "Employment Status",
        }
    }

    /// Zero-based position in canonical order
    pub fn index(&self) -> usize {
        Column::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error for an unrecognized column key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown column: {0}")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.key() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

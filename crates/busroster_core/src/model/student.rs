//! Student domain model.
//!
//! # Responsibility
//! - Define the registered rider record and its fee/payment projections.
//! - Provide partial-update (patch) semantics for edits.
//!
//! # Invariants
//! - `student_id` is non-empty and never reused for another student.
//! - `fees_total` and `fees_paid` are non-negative minor currency units.
//! - Over-payment (`fees_paid > fees_total`) is valid state, not an error.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Caller-supplied student code (for example the school roll number).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    /// Creates a student code from raw input, trimming surrounding whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyStudentId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for StudentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StudentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudentId> for String {
    fn from(value: StudentId) -> Self {
        value.0
    }
}

/// Lifecycle state of a registered student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    /// Currently riding.
    Active,
    /// Temporarily not riding (soft removal).
    Suspended,
    /// Left the service permanently.
    Graduated,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Graduated => "graduated",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "graduated" => Ok(Self::Graduated),
            other => Err(ValidationError::InvalidStudentStatus(other.to_string())),
        }
    }
}

/// WGS84 coordinate pair consumed read-only by map rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        let point = Self { lat, lon };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lon_ok = self.lon.is_finite() && (-180.0..=180.0).contains(&self.lon);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(ValidationError::CoordinateOutOfRange {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

/// Registered rider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    /// Residential area (neighbourhood) used for pickup grouping.
    pub area: Option<String>,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
    /// Fees owed for the term, in minor currency units.
    pub fees_total: i64,
    /// Fees received so far, in minor currency units.
    pub fees_paid: i64,
    pub status: StudentStatus,
}

impl Student {
    /// Creates an active student with no fees and no contact details.
    pub fn new(student_id: StudentId, name: impl Into<String>) -> Self {
        Self {
            student_id,
            name: name.into(),
            area: None,
            phone: None,
            location: None,
            fees_total: 0,
            fees_paid: 0,
            status: StudentStatus::Active,
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { record: "student" });
        }
        if self.fees_total < 0 {
            return Err(ValidationError::NegativeAmount {
                field: "fees_total",
                value: self.fees_total,
            });
        }
        if self.fees_paid < 0 {
            return Err(ValidationError::NegativeAmount {
                field: "fees_paid",
                value: self.fees_paid,
            });
        }
        if let Some(location) = self.location.as_ref() {
            location.validate()?;
        }
        Ok(())
    }

    /// Outstanding amount; negative when the student over-paid.
    pub fn balance(&self) -> i64 {
        self.fees_total - self.fees_paid
    }

    /// Paid share of the total, `0.0` when nothing is owed.
    pub fn payment_ratio(&self) -> f64 {
        if self.fees_total == 0 {
            return 0.0;
        }
        self.fees_paid as f64 / self.fees_total as f64
    }

    pub fn is_paid_in_full(&self) -> bool {
        self.fees_paid >= self.fees_total
    }

    /// Applies a patch in place. Unset patch fields keep current values.
    pub fn apply(&mut self, patch: &StudentPatch) {
        if let Some(name) = patch.name.as_ref() {
            self.name = name.trim().to_string();
        }
        if let Some(area) = patch.area.as_ref() {
            self.area = area.clone();
        }
        if let Some(phone) = patch.phone.as_ref() {
            self.phone = phone.clone();
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(fees_total) = patch.fees_total {
            self.fees_total = fees_total;
        }
        if let Some(fees_paid) = patch.fees_paid {
            self.fees_paid = fees_paid;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Partial update for a student.
///
/// Optional columns use `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub area: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub location: Option<Option<GeoPoint>>,
    pub fees_total: Option<i64>,
    pub fees_paid: Option<i64>,
    pub status: Option<StudentStatus>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

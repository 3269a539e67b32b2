//! Field validation errors shared by roster and ledger records.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure for a roster or ledger input.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Student code is empty after trimming.
    EmptyStudentId,
    /// Display name is empty after trimming.
    EmptyName { record: &'static str },
    /// Driver seating capacity must be at least one.
    NonPositiveCapacity(i64),
    /// Monetary field is below zero.
    NegativeAmount { field: &'static str, value: i64 },
    /// Latitude/longitude pair is outside the WGS84 range.
    CoordinateOutOfRange { lat: f64, lon: f64 },
    /// Service date is not a `YYYY-MM-DD` calendar date.
    InvalidServiceDate(String),
    /// Date range ends before it starts.
    InvalidDateRange { from: String, to: String },
    /// Unknown trip label.
    InvalidTripType(String),
    /// Unknown student lifecycle label.
    InvalidStudentStatus(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStudentId => write!(f, "student_id cannot be empty"),
            Self::EmptyName { record } => write!(f, "{record} name cannot be empty"),
            Self::NonPositiveCapacity(value) => {
                write!(f, "capacity must be greater than zero, got {value}")
            }
            Self::NegativeAmount { field, value } => {
                write!(f, "{field} cannot be negative, got {value}")
            }
            Self::CoordinateOutOfRange { lat, lon } => {
                write!(f, "coordinates out of range: lat={lat} lon={lon}")
            }
            Self::InvalidServiceDate(value) => {
                write!(f, "invalid service date `{value}`; expected YYYY-MM-DD")
            }
            Self::InvalidDateRange { from, to } => {
                write!(f, "invalid date range: `{to}` is before `{from}`")
            }
            Self::InvalidTripType(value) => {
                write!(f, "invalid trip `{value}`; expected outbound|return")
            }
            Self::InvalidStudentStatus(value) => write!(
                f,
                "invalid student status `{value}`; expected active|suspended|graduated"
            ),
        }
    }
}

impl Error for ValidationError {}

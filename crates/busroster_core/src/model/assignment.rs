//! Assignment ledger model.
//!
//! # Responsibility
//! - Define the service-date key and trip leg used by the daily ledger.
//! - Define the student set stored under one ledger key.
//!
//! # Invariants
//! - `ServiceDate` is a calendar day with canonical `YYYY-MM-DD` text, so
//!   lexical order of the stored text equals calendar order.
//! - A fact is keyed by `(service_date, driver_id, student_id, trip)` and has
//!   set semantics.

use crate::model::student::StudentId;
use crate::model::validation::ValidationError;
use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Set of students assigned under one ledger key.
pub type AssignmentSet = BTreeSet<StudentId>;

/// Calendar day a seat assignment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceDate(NaiveDate);

impl ServiceDate {
    /// Parses strict `YYYY-MM-DD` input.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !ISO_DATE_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidServiceDate(trimmed.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidServiceDate(trimmed.to_string()))
    }

    /// Current day on the caller's local calendar.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Canonical storage text.
    pub fn to_iso(&self) -> String {
        self.0.format(ISO_DATE_FORMAT).to_string()
    }
}

impl Display for ServiceDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(ISO_DATE_FORMAT))
    }
}

impl TryFrom<String> for ServiceDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServiceDate> for String {
    fn from(value: ServiceDate) -> Self {
        value.to_iso()
    }
}

/// Inclusive range of service dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: ServiceDate,
    pub to: ServiceDate,
}

impl DateRange {
    pub fn new(from: ServiceDate, to: ServiceDate) -> Result<Self, ValidationError> {
        if to < from {
            return Err(ValidationError::InvalidDateRange {
                from: from.to_iso(),
                to: to.to_iso(),
            });
        }
        Ok(Self { from, to })
    }
}

/// Leg of the daily service.
///
/// Single-trip deployments record everything as `Outbound`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    /// Home to school.
    #[default]
    Outbound,
    /// School to home.
    Return,
}

impl TripType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "outbound",
            Self::Return => "return",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "outbound" => Ok(Self::Outbound),
            "return" => Ok(Self::Return),
            other => Err(ValidationError::InvalidTripType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DateRange, ServiceDate, TripType};

    #[test]
    fn service_date_accepts_canonical_iso_text() {
        let date = ServiceDate::parse("2026-01-10").unwrap();
        assert_eq!(date.to_iso(), "2026-01-10");
        assert_eq!(date.to_string(), "2026-01-10");
    }

    #[test]
    fn service_date_rejects_non_canonical_and_impossible_dates() {
        assert!(ServiceDate::parse("2026-1-10").is_err());
        assert!(ServiceDate::parse("2026-02-30").is_err());
        assert!(ServiceDate::parse("10/01/2026").is_err());
        assert!(ServiceDate::parse("2026-01-10T08:00:00").is_err());
    }

    #[test]
    fn service_dates_order_by_calendar() {
        let earlier = ServiceDate::parse("2025-12-31").unwrap();
        let later = ServiceDate::parse("2026-01-01").unwrap();
        assert!(earlier < later);
        assert!(earlier.to_iso() < later.to_iso());
    }

    #[test]
    fn trip_defaults_to_outbound_and_parses_labels() {
        assert_eq!(TripType::default(), TripType::Outbound);
        assert_eq!(TripType::parse("RETURN").unwrap(), TripType::Return);
        assert!(TripType::parse("both").is_err());
    }

    #[test]
    fn date_range_accepts_single_day_and_rejects_reversed_bounds() {
        let from = ServiceDate::parse("2026-01-10").unwrap();
        let to = ServiceDate::parse("2026-01-12").unwrap();
        let range = DateRange::new(from, to).unwrap();
        assert_eq!((range.from, range.to), (from, to));
        assert!(DateRange::new(from, from).is_ok());
        assert!(DateRange::new(to, from).is_err());
    }
}

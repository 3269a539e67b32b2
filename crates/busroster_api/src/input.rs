//! Request payloads accepted by command handlers and their conversion into
//! core types.
//!
//! Text fields are trimmed. On update payloads an empty string clears an
//! optional column; `None` keeps the stored value.

use crate::envelope::{ApiError, ApiResult};
use busroster_core::{
    Driver, DriverId, DriverPatch, GeoPoint, PaymentFilter, ReportFilter, ServiceDate, Student,
    StudentId, StudentPatch, StudentStatus, TripType, DEFAULT_DRIVER_CAPACITY,
};
use serde::Deserialize;
use uuid::Uuid;

/// New student registration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentInput {
    pub student_id: String,
    pub name: String,
    pub area: Option<String>,
    pub phone: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub fees_total: i64,
    #[serde(default)]
    pub fees_paid: i64,
    pub status: Option<String>,
}

impl StudentInput {
    pub(crate) fn into_student(self) -> ApiResult<Student> {
        let mut student = Student::new(StudentId::new(self.student_id)?, self.name.trim());
        student.area = non_empty(self.area);
        student.phone = non_empty(self.phone);
        student.location = location(self.lat, self.lon)?;
        student.fees_total = self.fees_total;
        student.fees_paid = self.fees_paid;
        if let Some(status) = self.status.as_deref() {
            student.status = StudentStatus::parse(status)?;
        }
        Ok(student)
    }
}

/// Partial student edit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub area: Option<String>,
    pub phone: Option<String>,
    /// Setting both moves the pin; leaving both out keeps it.
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub clear_location: bool,
    pub fees_total: Option<i64>,
    pub fees_paid: Option<i64>,
    pub status: Option<String>,
}

impl StudentUpdate {
    pub(crate) fn into_patch(self) -> ApiResult<StudentPatch> {
        let location = if self.clear_location {
            Some(None)
        } else {
            location(self.lat, self.lon)?.map(Some)
        };
        Ok(StudentPatch {
            name: self.name.map(|name| name.trim().to_string()),
            area: self.area.map(|area| non_empty(Some(area))),
            phone: self.phone.map(|phone| non_empty(Some(phone))),
            location,
            fees_total: self.fees_total,
            fees_paid: self.fees_paid,
            status: self
                .status
                .as_deref()
                .map(StudentStatus::parse)
                .transpose()?,
        })
    }
}

/// New driver registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DriverInput {
    /// Existing id for imports; generated when absent.
    pub driver_id: Option<String>,
    pub name: String,
    pub vehicle: Option<String>,
    pub phone: Option<String>,
    pub capacity: Option<u32>,
    pub service_area: Option<String>,
}

impl DriverInput {
    pub(crate) fn into_driver(self) -> ApiResult<Driver> {
        let mut driver = match self.driver_id.as_deref() {
            Some(raw) => Driver::with_id(parse_driver_id(raw)?, self.name.trim()),
            None => Driver::new(self.name.trim()),
        };
        driver.vehicle = non_empty(self.vehicle);
        driver.phone = non_empty(self.phone);
        driver.capacity = self.capacity.unwrap_or(DEFAULT_DRIVER_CAPACITY);
        driver.service_area = non_empty(self.service_area);
        Ok(driver)
    }
}

/// Partial driver edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DriverUpdate {
    pub name: Option<String>,
    pub vehicle: Option<String>,
    pub phone: Option<String>,
    pub capacity: Option<u32>,
    pub service_area: Option<String>,
}

impl DriverUpdate {
    pub(crate) fn into_patch(self) -> DriverPatch {
        DriverPatch {
            name: self.name.map(|name| name.trim().to_string()),
            vehicle: self.vehicle.map(|value| non_empty(Some(value))),
            phone: self.phone.map(|value| non_empty(Some(value))),
            capacity: self.capacity,
            service_area: self.service_area.map(|value| non_empty(Some(value))),
        }
    }
}

/// Student report filter as sent by front ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportRequest {
    pub text: Option<String>,
    /// `any` (default), `paid` or `unpaid`.
    pub payment: Option<String>,
    pub status: Option<String>,
}

impl ReportRequest {
    pub(crate) fn into_filter(self) -> ApiResult<ReportFilter> {
        let payment = match self.payment.as_deref().map(str::trim) {
            None | Some("") | Some("any") => PaymentFilter::Any,
            Some("paid") => PaymentFilter::Paid,
            Some("unpaid") => PaymentFilter::Unpaid,
            Some(other) => {
                return Err(ApiError::InvalidInput(format!(
                    "unknown payment filter `{other}`; expected any|paid|unpaid"
                )))
            }
        };
        Ok(ReportFilter {
            text: non_empty(self.text),
            payment,
            status: self
                .status
                .as_deref()
                .map(StudentStatus::parse)
                .transpose()?,
        })
    }
}

pub(crate) fn parse_driver_id(raw: &str) -> ApiResult<DriverId> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::InvalidInput(format!("invalid driver id `{}`", raw.trim())))
}

pub(crate) fn parse_date(raw: &str) -> ApiResult<ServiceDate> {
    Ok(ServiceDate::parse(raw)?)
}

/// `None` means the handler's default (today for dates).
pub(crate) fn parse_date_or_today(raw: Option<&str>) -> ApiResult<ServiceDate> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_date(value),
        None => Ok(ServiceDate::today()),
    }
}

pub(crate) fn parse_trip(raw: Option<&str>) -> ApiResult<Option<TripType>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(TripType::parse(value)?)),
        None => Ok(None),
    }
}

pub(crate) fn parse_student_id(raw: &str) -> ApiResult<StudentId> {
    Ok(StudentId::new(raw)?)
}

fn location(lat: Option<f64>, lon: Option<f64>) -> ApiResult<Option<GeoPoint>> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon)?)),
        (None, None) => Ok(None),
        _ => Err(ApiError::InvalidInput(
            "lat and lon must be given together".to_string(),
        )),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

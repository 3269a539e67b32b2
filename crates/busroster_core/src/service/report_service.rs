//! Read-only reporting facade over roster and ledger.
//!
//! # Responsibility
//! - Join roster snapshots with derived attendance and fee projections.
//! - Produce flat, serializable rows for display and export collaborators.
//!
//! # Invariants
//! - Nothing in this module mutates stored state.
//! - `payment_ratio` is `0.0` when `fees_total == 0`.
//! - Filters are plain predicates (substring + enums), not a query language.

use crate::model::assignment::{ServiceDate, TripType};
use crate::model::driver::DriverId;
use crate::model::student::{Student, StudentStatus};
use crate::repo::error::RepoResult;
use crate::repo::ledger_repo::LedgerRepository;
use crate::repo::roster_repo::RosterRepository;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Payment-state predicate for report filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFilter {
    #[default]
    Any,
    /// `fees_paid >= fees_total`.
    Paid,
    /// `fees_paid < fees_total`.
    Unpaid,
}

/// Student report filter. Empty filter matches every student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Case-insensitive substring matched against name and student id.
    pub text: Option<String>,
    pub payment: PaymentFilter,
    pub status: Option<StudentStatus>,
}

impl ReportFilter {
    pub fn matches(&self, student: &Student) -> bool {
        if let Some(needle) = self.normalized_text() {
            let in_name = student.name.to_lowercase().contains(&needle);
            let in_id = student.student_id.as_str().to_lowercase().contains(&needle);
            if !in_name && !in_id {
                return false;
            }
        }

        let payment_ok = match self.payment {
            PaymentFilter::Any => true,
            PaymentFilter::Paid => student.is_paid_in_full(),
            PaymentFilter::Unpaid => !student.is_paid_in_full(),
        };
        if !payment_ok {
            return false;
        }

        self.status.map_or(true, |status| student.status == status)
    }

    fn normalized_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    }
}

/// One student line of the full report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReportRow {
    pub student_id: String,
    pub name: String,
    pub area: Option<String>,
    pub phone: Option<String>,
    pub status: StudentStatus,
    pub fees_total: i64,
    pub fees_paid: i64,
    /// `fees_total - fees_paid`; negative on over-payment.
    pub balance: i64,
    pub payment_ratio: f64,
    pub attendance_days: u32,
}

/// One driver line of the daily distribution sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySheetRow {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub vehicle: Option<String>,
    pub capacity: u32,
    pub assigned: usize,
    /// Negative only when capacity was lowered after the set was committed.
    pub seats_left: i64,
    /// Riders ordered by name; `student_ids[i]` and `student_names[i]` pair up.
    pub student_ids: Vec<String>,
    pub student_names: Vec<String>,
}

/// Per-driver load on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverLoad {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub assigned: usize,
}

/// Overview counters for one service date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub date: ServiceDate,
    pub students: usize,
    pub paid_students: usize,
    pub drivers: usize,
    /// Distinct students with a seat on `date`.
    pub assigned_students: usize,
    pub per_driver: Vec<DriverLoad>,
}

/// Student position consumed read-only by map rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub student_id: String,
    pub name: String,
    pub area: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Reporting facade over one roster and one ledger repository.
pub struct ReportService<R: RosterRepository, L: LedgerRepository> {
    roster: R,
    ledger: L,
}

impl<R: RosterRepository, L: LedgerRepository> ReportService<R, L> {
    pub fn new(roster: R, ledger: L) -> Self {
        Self { roster, ledger }
    }

    /// Roster joined with attendance and fee projections, filtered.
    pub fn student_report(&self, filter: &ReportFilter) -> RepoResult<Vec<StudentReportRow>> {
        let attendance = self.ledger.attendance_days_by_student()?;
        let rows = self
            .roster
            .list_students()?
            .into_iter()
            .filter(|student| filter.matches(student))
            .map(|student| {
                let attendance_days = attendance.get(&student.student_id).copied().unwrap_or(0);
                StudentReportRow {
                    student_id: student.student_id.to_string(),
                    balance: student.balance(),
                    payment_ratio: student.payment_ratio(),
                    name: student.name,
                    area: student.area,
                    phone: student.phone,
                    status: student.status,
                    fees_total: student.fees_total,
                    fees_paid: student.fees_paid,
                    attendance_days,
                }
            })
            .collect();
        Ok(rows)
    }

    /// One row per driver with the set committed for `date`.
    ///
    /// `trip = None` merges both legs.
    pub fn daily_sheet(
        &self,
        date: ServiceDate,
        trip: Option<TripType>,
    ) -> RepoResult<Vec<DailySheetRow>> {
        let by_driver = self.ledger.list_for_date(date, trip)?;
        let names = self.student_names()?;

        let rows = self
            .roster
            .list_drivers()?
            .into_iter()
            .map(|driver| {
                let mut riders = by_driver
                    .get(&driver.driver_id)
                    .map(|set| {
                        set.iter()
                            .map(|id| {
                                let id = id.to_string();
                                let name = names.get(&id).cloned().unwrap_or_else(|| id.clone());
                                (name, id)
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                riders.sort();
                let (student_names, student_ids): (Vec<_>, Vec<_>) = riders.into_iter().unzip();
                let count = student_ids.len();
                DailySheetRow {
                    driver_id: driver.driver_id,
                    driver_name: driver.name,
                    vehicle: driver.vehicle,
                    capacity: driver.capacity,
                    assigned: count,
                    seats_left: i64::from(driver.capacity) - count as i64,
                    student_ids,
                    student_names,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Overview counters for `date`, both trip legs merged.
    pub fn dashboard_summary(&self, date: ServiceDate) -> RepoResult<DashboardSummary> {
        let students = self.roster.list_students()?;
        let drivers = self.roster.list_drivers()?;
        let by_driver = self.ledger.list_for_date(date, None)?;

        let assigned_students = by_driver
            .values()
            .flat_map(|set| set.iter())
            .collect::<BTreeSet<_>>()
            .len();
        let per_driver = drivers
            .iter()
            .map(|driver| DriverLoad {
                driver_id: driver.driver_id,
                driver_name: driver.name.clone(),
                assigned: by_driver.get(&driver.driver_id).map_or(0, BTreeSet::len),
            })
            .collect();

        Ok(DashboardSummary {
            date,
            students: students.len(),
            paid_students: students.iter().filter(|s| s.is_paid_in_full()).count(),
            drivers: drivers.len(),
            assigned_students,
            per_driver,
        })
    }

    /// Students that have a stored location.
    pub fn map_points(&self) -> RepoResult<Vec<MapPoint>> {
        let points = self
            .roster
            .list_students()?
            .into_iter()
            .filter_map(|student| {
                let location = student.location?;
                Some(MapPoint {
                    student_id: student.student_id.to_string(),
                    name: student.name,
                    area: student.area,
                    lat: location.lat,
                    lon: location.lon,
                })
            })
            .collect();
        Ok(points)
    }

    fn student_names(&self) -> RepoResult<BTreeMap<String, String>> {
        Ok(self
            .roster
            .list_students()?
            .into_iter()
            .map(|student| (student.student_id.to_string(), student.name))
            .collect())
    }
}

const STUDENT_REPORT_HEADER: &str =
    "student_id,name,area,phone,status,fees_total,fees_paid,balance,payment_ratio,attendance_days";

/// Renders report rows as RFC 4180 CSV (header included).
pub fn student_report_csv(rows: &[StudentReportRow]) -> String {
    let mut csv = String::from(STUDENT_REPORT_HEADER);
    csv.push('\n');
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{:.4},{}\n",
            csv_quote(&row.student_id),
            csv_quote(&row.name),
            csv_quote(row.area.as_deref().unwrap_or("")),
            csv_quote(row.phone.as_deref().unwrap_or("")),
            row.status.as_str(),
            row.fees_total,
            row.fees_paid,
            row.balance,
            row.payment_ratio,
            row.attendance_days
        ));
    }
    csv
}

fn csv_quote(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

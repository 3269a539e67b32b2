//! Use-case command handlers.
//!
//! # Responsibility
//! - Bind each front-end action to exactly one store operation.
//! - Open a migrated connection per call and turn every outcome into an
//!   envelope.
//!
//! # Invariants
//! - Handlers never panic and never return `Err`; failures are envelopes.
//! - Mutations happen only through core services, inside their transactions.

use crate::envelope::{ActionResponse, ApiError, ApiResult, QueryResponse};
use crate::input::{
    parse_date, parse_date_or_today, parse_driver_id, parse_student_id, parse_trip, DriverInput,
    DriverUpdate, ReportRequest, StudentInput, StudentUpdate,
};
use busroster_core::db::open_db;
use busroster_core::{
    student_report_csv, AssignmentSet, AttendanceService, DailySheetRow, DashboardSummary,
    DateRange, Driver, LedgerService, MapPoint, ReportService, RosterService,
    SqliteLedgerRepository, SqliteRosterRepository, Student, StudentReportRow,
};
use log::{error, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const DB_PATH_ENV: &str = "BUSROSTER_DB_PATH";
const DB_FILE_NAME: &str = "busroster.sqlite3";
static DEFAULT_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Database path from `BUSROSTER_DB_PATH`, or `<temp_dir>/busroster.sqlite3`.
///
/// Resolved once per process.
pub fn resolve_db_path() -> PathBuf {
    DEFAULT_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Command handlers bound to one database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusRosterApi {
    db_path: PathBuf,
}

type Roster<'c> = RosterService<SqliteRosterRepository<'c>>;
type Ledger<'c> = LedgerService<SqliteLedgerRepository<'c>>;
type Reports<'c> = ReportService<SqliteRosterRepository<'c>, SqliteLedgerRepository<'c>>;

impl Default for BusRosterApi {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BusRosterApi {
    /// Handlers over the environment-resolved database.
    pub fn from_env() -> Self {
        Self::with_db_path(resolve_db_path())
    }

    /// Handlers over an explicit database file (CLI `--db`, tests).
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Inserts the demo roster when both registries are empty.
    pub fn on_seed(&self) -> ActionResponse {
        self.act("on_seed", |conn| {
            let inserted = roster(conn)?.seed_demo_roster()?;
            let message = if inserted {
                "Demo roster inserted."
            } else {
                "Roster not empty; nothing seeded."
            };
            Ok((message.to_string(), None))
        })
    }

    pub fn on_add_student(&self, input: StudentInput) -> ActionResponse {
        self.act("on_add_student", |conn| {
            let student = roster(conn)?.add_student(&input.into_student()?)?;
            Ok((
                "Student added.".to_string(),
                Some(student.student_id.to_string()),
            ))
        })
    }

    pub fn on_update_student(&self, student_id: &str, update: StudentUpdate) -> ActionResponse {
        self.act("on_update_student", |conn| {
            let id = parse_student_id(student_id)?;
            roster(conn)?.update_student(&id, &update.into_patch()?)?;
            Ok(("Student updated.".to_string(), Some(id.to_string())))
        })
    }

    /// Removes the student and all of its assignments.
    pub fn on_remove_student(&self, student_id: &str) -> ActionResponse {
        self.act("on_remove_student", |conn| {
            let id = parse_student_id(student_id)?;
            let removed = roster(conn)?.remove_student(&id)?;
            Ok((
                format!("Student removed with {removed} assignment(s)."),
                Some(id.to_string()),
            ))
        })
    }

    /// Payment toggle: paid sets `fees_paid = fees_total`, unpaid resets to 0.
    pub fn on_set_payment_status(&self, student_id: &str, paid: bool) -> ActionResponse {
        self.act("on_set_payment_status", |conn| {
            let id = parse_student_id(student_id)?;
            let student = roster(conn)?.set_payment_status(&id, paid)?;
            Ok((
                format!("Paid {} of {}.", student.fees_paid, student.fees_total),
                Some(id.to_string()),
            ))
        })
    }

    pub fn on_record_payment(&self, student_id: &str, amount: i64) -> ActionResponse {
        self.act("on_record_payment", |conn| {
            let id = parse_student_id(student_id)?;
            let student = roster(conn)?.record_payment(&id, amount)?;
            Ok((
                format!("Balance {}.", student.balance()),
                Some(id.to_string()),
            ))
        })
    }

    pub fn on_add_driver(&self, input: DriverInput) -> ActionResponse {
        self.act("on_add_driver", |conn| {
            let driver = roster(conn)?.add_driver(&input.into_driver()?)?;
            Ok((
                "Driver added.".to_string(),
                Some(driver.driver_id.to_string()),
            ))
        })
    }

    pub fn on_update_driver(&self, driver_id: &str, update: DriverUpdate) -> ActionResponse {
        self.act("on_update_driver", |conn| {
            let id = parse_driver_id(driver_id)?;
            roster(conn)?.update_driver(id, &update.into_patch())?;
            Ok(("Driver updated.".to_string(), Some(id.to_string())))
        })
    }

    /// Removes the driver and all of its assignments.
    pub fn on_remove_driver(&self, driver_id: &str) -> ActionResponse {
        self.act("on_remove_driver", |conn| {
            let id = parse_driver_id(driver_id)?;
            let removed = roster(conn)?.remove_driver(id)?;
            Ok((
                format!("Driver removed with {removed} assignment(s)."),
                Some(id.to_string()),
            ))
        })
    }

    pub fn on_list_students(&self) -> QueryResponse<Vec<Student>> {
        self.query("on_list_students", |conn| {
            let students = roster(conn)?.list_students()?;
            let message = format!("{} student(s).", students.len());
            Ok((students, message))
        })
    }

    pub fn on_list_drivers(&self) -> QueryResponse<Vec<Driver>> {
        self.query("on_list_drivers", |conn| {
            let drivers = roster(conn)?.list_drivers()?;
            let message = format!("{} driver(s).", drivers.len());
            Ok((drivers, message))
        })
    }

    /// Replaces the full student set for `(date, driver, trip)`.
    ///
    /// `trip = None` uses the default (outbound) leg.
    pub fn on_set_assignment(
        &self,
        date: &str,
        driver_id: &str,
        trip: Option<&str>,
        student_ids: &[String],
    ) -> ActionResponse {
        self.act("on_set_assignment", |conn| {
            let date = parse_date(date)?;
            let driver_id = parse_driver_id(driver_id)?;
            let trip = parse_trip(trip)?.unwrap_or_default();
            let students = student_ids
                .iter()
                .map(|raw| parse_student_id(raw))
                .collect::<ApiResult<AssignmentSet>>()?;
            let outcome = ledger(conn)?.set_trip_assignment(date, driver_id, trip, &students)?;
            Ok((
                format!(
                    "{} assigned ({} added, {} removed).",
                    students.len(),
                    outcome.added,
                    outcome.removed
                ),
                Some(driver_id.to_string()),
            ))
        })
    }

    /// Current set for `(date, driver)`; `trip = None` merges both legs.
    pub fn on_get_assignment(
        &self,
        date: &str,
        driver_id: &str,
        trip: Option<&str>,
    ) -> QueryResponse<Vec<String>> {
        self.query("on_get_assignment", |conn| {
            let date = parse_date(date)?;
            let driver_id = parse_driver_id(driver_id)?;
            let set = ledger(conn)?.get_trip_assignment(date, driver_id, parse_trip(trip)?)?;
            let ids = set.iter().map(ToString::to_string).collect::<Vec<_>>();
            let message = format!("{} student(s).", ids.len());
            Ok((ids, message))
        })
    }

    /// Clears `(date, driver)` for one leg, or every leg with `trip = None`.
    pub fn on_clear_assignment(
        &self,
        date: &str,
        driver_id: &str,
        trip: Option<&str>,
    ) -> ActionResponse {
        self.act("on_clear_assignment", |conn| {
            let date = parse_date(date)?;
            let driver_id = parse_driver_id(driver_id)?;
            let removed =
                ledger(conn)?.remove_trip_assignment(date, driver_id, parse_trip(trip)?)?;
            Ok((
                format!("{removed} assignment(s) cleared."),
                Some(driver_id.to_string()),
            ))
        })
    }

    /// Attendance days, optionally limited to an inclusive date range.
    pub fn on_attendance(
        &self,
        student_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> QueryResponse<u32> {
        self.query("on_attendance", |conn| {
            let id = parse_student_id(student_id)?;
            let attendance =
                AttendanceService::new(SqliteLedgerRepository::try_new(conn)?);
            let days = match (from, to) {
                (None, None) => attendance.attendance_days(&id)?,
                (Some(from), Some(to)) => {
                    let range = DateRange::new(parse_date(from)?, parse_date(to)?)?;
                    attendance.attendance_days_between(&id, range)?
                }
                _ => {
                    return Err(ApiError::InvalidInput(
                        "attendance range needs both from and to".to_string(),
                    ))
                }
            };
            Ok((days, format!("{days} day(s).")))
        })
    }

    pub fn on_student_report(&self, request: ReportRequest) -> QueryResponse<Vec<StudentReportRow>> {
        self.query("on_student_report", |conn| {
            let rows = reports(conn)?.student_report(&request.into_filter()?)?;
            let message = format!("{} row(s).", rows.len());
            Ok((rows, message))
        })
    }

    /// Student report rendered as CSV text.
    pub fn on_export_report_csv(&self, request: ReportRequest) -> QueryResponse<String> {
        self.query("on_export_report_csv", |conn| {
            let rows = reports(conn)?.student_report(&request.into_filter()?)?;
            let message = format!("{} row(s).", rows.len());
            Ok((student_report_csv(&rows), message))
        })
    }

    /// Per-driver sheet; `date = None` means today, `trip = None` merges legs.
    pub fn on_daily_sheet(
        &self,
        date: Option<&str>,
        trip: Option<&str>,
    ) -> QueryResponse<Vec<DailySheetRow>> {
        self.query("on_daily_sheet", |conn| {
            let date = parse_date_or_today(date)?;
            let rows = reports(conn)?.daily_sheet(date, parse_trip(trip)?)?;
            Ok((rows, format!("Sheet for {date}.")))
        })
    }

    pub fn on_dashboard(&self, date: Option<&str>) -> QueryResponse<DashboardSummary> {
        self.query("on_dashboard", |conn| {
            let date = parse_date_or_today(date)?;
            let summary = reports(conn)?.dashboard_summary(date)?;
            Ok((summary, format!("Summary for {date}.")))
        })
    }

    pub fn on_map_points(&self) -> QueryResponse<Vec<MapPoint>> {
        self.query("on_map_points", |conn| {
            let points = reports(conn)?.map_points()?;
            let message = format!("{} located student(s).", points.len());
            Ok((points, message))
        })
    }

    fn open(&self) -> ApiResult<Connection> {
        Ok(open_db(&self.db_path)?)
    }

    fn act(
        &self,
        operation: &str,
        f: impl FnOnce(&Connection) -> ApiResult<(String, Option<String>)>,
    ) -> ActionResponse {
        match self.open().and_then(|conn| f(&conn)) {
            Ok((message, record_id)) => ActionResponse::success(message, record_id),
            Err(err) => {
                log_failure(operation, &err);
                ActionResponse::failure(operation, &err)
            }
        }
    }

    fn query<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&Connection) -> ApiResult<(T, String)>,
    ) -> QueryResponse<T> {
        match self.open().and_then(|conn| f(&conn)) {
            Ok((data, message)) => QueryResponse::success(data, message),
            Err(err) => {
                log_failure(operation, &err);
                QueryResponse::failure(operation, &err)
            }
        }
    }
}

fn roster(conn: &Connection) -> ApiResult<Roster<'_>> {
    Ok(RosterService::new(SqliteRosterRepository::try_new(conn)?))
}

fn ledger(conn: &Connection) -> ApiResult<Ledger<'_>> {
    Ok(LedgerService::new(SqliteLedgerRepository::try_new(conn)?))
}

fn reports(conn: &Connection) -> ApiResult<Reports<'_>> {
    Ok(ReportService::new(
        SqliteRosterRepository::try_new(conn)?,
        SqliteLedgerRepository::try_new(conn)?,
    ))
}

fn log_failure(operation: &str, err: &ApiError) {
    if err.is_client_error() {
        warn!(
            "event=api_call module=api status=rejected operation={} error_code={}",
            operation,
            err.code()
        );
    } else {
        error!(
            "event=api_call module=api status=error operation={} error_code={}",
            operation,
            err.code()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_db_path, BusRosterApi};
    use crate::input::{DriverInput, StudentInput};

    #[test]
    fn resolved_path_is_stable() {
        assert_eq!(resolve_db_path(), resolve_db_path());
    }

    #[test]
    fn unopenable_database_becomes_failure_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let api = BusRosterApi::with_db_path(dir.path());

        let response = api.on_seed();
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("db_open_failed"));
    }

    #[test]
    fn malformed_driver_id_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let api = BusRosterApi::with_db_path(dir.path().join("roster.sqlite3"));

        let response = api.on_set_assignment("2026-01-10", "not-a-uuid", None, &[]);
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("invalid_input"));
    }

    #[test]
    fn add_then_list_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let api = BusRosterApi::with_db_path(dir.path().join("roster.sqlite3"));

        let added = api.on_add_student(StudentInput {
            student_id: "101".into(),
            name: "Noura".into(),
            ..StudentInput::default()
        });
        assert!(added.ok, "{}", added.message);
        assert_eq!(added.record_id.as_deref(), Some("101"));

        let driver = api.on_add_driver(DriverInput {
            name: "Ahmed".into(),
            capacity: Some(1),
            ..DriverInput::default()
        });
        assert!(driver.ok, "{}", driver.message);

        let students = api.on_list_students();
        assert_eq!(students.data.map(|list| list.len()), Some(1));
    }
}

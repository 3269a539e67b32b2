//! Assignment ledger repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist per-date, per-driver, per-trip student sets.
//! - Enforce seat capacity and one-seat-per-student at write time.
//! - Answer attendance questions by scanning stored facts.
//!
//! # Invariants
//! - `replace_assignment` replaces the whole set for `(date, driver, trip)` in
//!   one immediate transaction; any failure leaves the prior set untouched.
//! - Capacity is read inside the write transaction and checked against the
//!   requested set size. Sets committed under an older, larger capacity are
//!   never revisited.
//! - A student holds at most one seat per `(date, trip)`.
//! - Attendance counts distinct dates, never facts.

use crate::model::assignment::{AssignmentSet, DateRange, ServiceDate, TripType};
use crate::model::driver::DriverId;
use crate::model::student::StudentId;
use crate::repo::ensure_connection_ready;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::roster_repo::parse_driver_id;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

/// Net change applied by one replace-set write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Facts newly inserted.
    pub added: usize,
    /// Facts removed because they were absent from the new set.
    pub removed: usize,
}

impl ReplaceOutcome {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Repository interface for the daily assignment ledger.
///
/// `trip = None` on read/clear paths means "all trips".
pub trait LedgerRepository {
    /// Replaces the student set for one `(date, driver, trip)` key.
    fn replace_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: TripType,
        students: &AssignmentSet,
    ) -> RepoResult<ReplaceOutcome>;
    fn get_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: Option<TripType>,
    ) -> RepoResult<AssignmentSet>;
    fn list_for_date(
        &self,
        date: ServiceDate,
        trip: Option<TripType>,
    ) -> RepoResult<BTreeMap<DriverId, AssignmentSet>>;
    fn is_student_assigned(&self, date: ServiceDate, student_id: &StudentId) -> RepoResult<bool>;
    /// Deletes facts for the key. Returns removed fact count.
    fn clear_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: Option<TripType>,
    ) -> RepoResult<usize>;
    /// Distinct dates with at least one fact for the student, ascending.
    fn assigned_dates(
        &self,
        student_id: &StudentId,
        range: Option<DateRange>,
    ) -> RepoResult<Vec<ServiceDate>>;
    fn count_attendance_days(
        &self,
        student_id: &StudentId,
        range: Option<DateRange>,
    ) -> RepoResult<u32>;
    /// Attendance days for every registered student (zero when never assigned).
    fn attendance_days_by_student(&self) -> RepoResult<BTreeMap<StudentId, u32>>;
}

/// SQLite-backed ledger repository.
pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["students", "drivers", "assignments"])?;
        Ok(Self { conn })
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn replace_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: TripType,
        students: &AssignmentSet,
    ) -> RepoResult<ReplaceOutcome> {
        let date_text = date.to_iso();
        let driver_text = driver_id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let capacity = driver_capacity_in_tx(&tx, &driver_text)?
            .ok_or(RepoError::UnknownDriver(driver_id))?;
        if students.len() > capacity as usize {
            return Err(RepoError::CapacityExceeded {
                driver_id,
                requested: students.len(),
                capacity,
            });
        }

        for student_id in students {
            if !student_exists_in_tx(&tx, student_id)? {
                return Err(RepoError::UnknownStudent(student_id.clone()));
            }
            if let Some(other) =
                seat_holder_in_tx(&tx, &date_text, student_id, trip, &driver_text)?
            {
                return Err(RepoError::AssignmentConflict {
                    student_id: student_id.clone(),
                    service_date: date,
                    trip,
                    assigned_driver: other,
                });
            }
        }

        let previous = load_set(&tx, &date_text, &driver_text, Some(trip))?;
        let mut outcome = ReplaceOutcome::default();

        for stale in previous.difference(students) {
            outcome.removed += tx.execute(
                "DELETE FROM assignments
                 WHERE service_date = ?1
                   AND driver_id = ?2
                   AND student_id = ?3
                   AND trip = ?4;",
                params![date_text, driver_text, stale.as_str(), trip.as_str()],
            )?;
        }

        for fresh in students.difference(&previous) {
            outcome.added += tx.execute(
                "INSERT OR IGNORE INTO assignments (service_date, driver_id, student_id, trip)
                 VALUES (?1, ?2, ?3, ?4);",
                params![date_text, driver_text, fresh.as_str(), trip.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn get_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: Option<TripType>,
    ) -> RepoResult<AssignmentSet> {
        load_set(self.conn, &date.to_iso(), &driver_id.to_string(), trip)
    }

    fn list_for_date(
        &self,
        date: ServiceDate,
        trip: Option<TripType>,
    ) -> RepoResult<BTreeMap<DriverId, AssignmentSet>> {
        let mut stmt = self.conn.prepare(
            "SELECT driver_id, student_id
             FROM assignments
             WHERE service_date = ?1
               AND (?2 IS NULL OR trip = ?2)
             ORDER BY driver_id ASC, student_id ASC;",
        )?;
        let mut rows = stmt.query(params![date.to_iso(), trip.map(TripType::as_str)])?;
        let mut by_driver: BTreeMap<DriverId, AssignmentSet> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let driver_text: String = row.get("driver_id")?;
            let student_text: String = row.get("student_id")?;
            by_driver
                .entry(parse_driver_id(&driver_text)?)
                .or_default()
                .insert(parse_student_id(&student_text)?);
        }
        Ok(by_driver)
    }

    fn is_student_assigned(&self, date: ServiceDate, student_id: &StudentId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM assignments
                WHERE service_date = ?1 AND student_id = ?2
            );",
            params![date.to_iso(), student_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn clear_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: Option<TripType>,
    ) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM assignments
             WHERE service_date = ?1
               AND driver_id = ?2
               AND (?3 IS NULL OR trip = ?3);",
            params![
                date.to_iso(),
                driver_id.to_string(),
                trip.map(TripType::as_str)
            ],
        )?;
        Ok(removed)
    }

    fn assigned_dates(
        &self,
        student_id: &StudentId,
        range: Option<DateRange>,
    ) -> RepoResult<Vec<ServiceDate>> {
        let (from, to) = range_bounds(range);
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT service_date
             FROM assignments
             WHERE student_id = ?1
               AND (?2 IS NULL OR service_date >= ?2)
               AND (?3 IS NULL OR service_date <= ?3)
             ORDER BY service_date ASC;",
        )?;
        let mut rows = stmt.query(params![student_id.as_str(), from, to])?;
        let mut dates = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            dates.push(ServiceDate::parse(&text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid service date `{text}` in assignments.service_date"
                ))
            })?);
        }
        Ok(dates)
    }

    fn count_attendance_days(
        &self,
        student_id: &StudentId,
        range: Option<DateRange>,
    ) -> RepoResult<u32> {
        let (from, to) = range_bounds(range);
        let days: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT service_date)
             FROM assignments
             WHERE student_id = ?1
               AND (?2 IS NULL OR service_date >= ?2)
               AND (?3 IS NULL OR service_date <= ?3);",
            params![student_id.as_str(), from, to],
            |row| row.get(0),
        )?;
        to_day_count(days)
    }

    fn attendance_days_by_student(&self) -> RepoResult<BTreeMap<StudentId, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.student_id, COUNT(DISTINCT a.service_date) AS days
             FROM students s
             LEFT JOIN assignments a ON a.student_id = s.student_id
             GROUP BY s.student_id;",
        )?;
        let mut rows = stmt.query([])?;
        let mut days_by_student = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let student_text: String = row.get("student_id")?;
            let days: i64 = row.get("days")?;
            days_by_student.insert(parse_student_id(&student_text)?, to_day_count(days)?);
        }
        Ok(days_by_student)
    }
}

fn load_set(
    conn: &Connection,
    date_text: &str,
    driver_text: &str,
    trip: Option<TripType>,
) -> RepoResult<AssignmentSet> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT student_id
         FROM assignments
         WHERE service_date = ?1
           AND driver_id = ?2
           AND (?3 IS NULL OR trip = ?3);",
    )?;
    let mut rows = stmt.query(params![date_text, driver_text, trip.map(TripType::as_str)])?;
    let mut set = AssignmentSet::new();
    while let Some(row) = rows.next()? {
        let student_text: String = row.get(0)?;
        set.insert(parse_student_id(&student_text)?);
    }
    Ok(set)
}

fn driver_capacity_in_tx(tx: &Transaction<'_>, driver_text: &str) -> RepoResult<Option<u32>> {
    let raw: Option<i64> = tx
        .query_row(
            "SELECT capacity FROM drivers WHERE driver_id = ?1;",
            [driver_text],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|value| {
        u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!("invalid capacity `{value}` in drivers.capacity"))
        })
    })
    .transpose()
}

fn student_exists_in_tx(tx: &Transaction<'_>, student_id: &StudentId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = ?1);",
        [student_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Returns the other driver holding the student's seat for `(date, trip)`.
fn seat_holder_in_tx(
    tx: &Transaction<'_>,
    date_text: &str,
    student_id: &StudentId,
    trip: TripType,
    driver_text: &str,
) -> RepoResult<Option<DriverId>> {
    let holder: Option<String> = tx
        .query_row(
            "SELECT driver_id
             FROM assignments
             WHERE service_date = ?1
               AND student_id = ?2
               AND trip = ?3
               AND driver_id <> ?4
             LIMIT 1;",
            params![date_text, student_id.as_str(), trip.as_str(), driver_text],
            |row| row.get(0),
        )
        .optional()?;
    holder.as_deref().map(parse_driver_id).transpose()
}

fn parse_student_id(value: &str) -> RepoResult<StudentId> {
    StudentId::new(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid student id `{value}`")))
}

fn range_bounds(range: Option<DateRange>) -> (Option<String>, Option<String>) {
    match range {
        Some(range) => (Some(range.from.to_iso()), Some(range.to.to_iso())),
        None => (None, None),
    }
}

fn to_day_count(value: i64) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid attendance count `{value}`")))
}

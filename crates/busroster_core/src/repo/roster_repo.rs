//! Roster repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `students` and `drivers`.
//! - Own cascade removal of ledger facts when a roster record is removed.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read-modify-write updates run in one immediate transaction.
//! - Removing a student or driver deletes its assignment facts in the same
//!   transaction as the record itself.
//! - List APIs return owned snapshots ordered by `name, id`.

use crate::model::driver::{Driver, DriverId, DriverPatch};
use crate::model::student::{GeoPoint, Student, StudentId, StudentPatch, StudentStatus};
use crate::model::validation::ValidationError;
use crate::repo::ensure_connection_ready;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const STUDENT_SELECT_SQL: &str = "SELECT
    student_id,
    name,
    area,
    phone,
    latitude,
    longitude,
    fees_total,
    fees_paid,
    status
FROM students";

const DRIVER_SELECT_SQL: &str = "SELECT
    driver_id,
    name,
    vehicle,
    phone,
    capacity,
    service_area
FROM drivers";

/// Repository interface for the student/driver registry.
pub trait RosterRepository {
    fn create_student(&self, student: &Student) -> RepoResult<()>;
    /// Applies a partial update and returns the stored result.
    fn patch_student(&self, id: &StudentId, patch: &StudentPatch) -> RepoResult<Student>;
    /// Sets `fees_paid` to `fees_total` (`paid = true`) or to zero.
    fn mark_paid(&self, id: &StudentId, paid: bool) -> RepoResult<Student>;
    /// Adds a non-negative amount to `fees_paid`.
    fn add_payment(&self, id: &StudentId, amount: i64) -> RepoResult<Student>;
    fn get_student(&self, id: &StudentId) -> RepoResult<Option<Student>>;
    fn list_students(&self) -> RepoResult<Vec<Student>>;
    /// Removes the student and its ledger facts. Returns removed fact count.
    fn delete_student(&self, id: &StudentId) -> RepoResult<usize>;

    fn create_driver(&self, driver: &Driver) -> RepoResult<()>;
    fn patch_driver(&self, id: DriverId, patch: &DriverPatch) -> RepoResult<Driver>;
    fn get_driver(&self, id: DriverId) -> RepoResult<Option<Driver>>;
    fn list_drivers(&self) -> RepoResult<Vec<Driver>>;
    /// Removes the driver and its ledger facts. Returns removed fact count.
    fn delete_driver(&self, id: DriverId) -> RepoResult<usize>;

    /// Inserts all records in one transaction when the registry is empty.
    ///
    /// Returns `false` without writing when anything is registered. Any
    /// rejected record rolls back the whole batch.
    fn seed_if_empty(&self, students: &[Student], drivers: &[Driver]) -> RepoResult<bool>;
}

/// SQLite-backed roster repository.
pub struct SqliteRosterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRosterRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["students", "drivers", "assignments"])?;
        Ok(Self { conn })
    }

    fn immediate(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl RosterRepository for SqliteRosterRepository<'_> {
    fn create_student(&self, student: &Student) -> RepoResult<()> {
        insert_student(self.conn, student)
    }

    fn patch_student(&self, id: &StudentId, patch: &StudentPatch) -> RepoResult<Student> {
        let tx = self.immediate()?;
        let mut student =
            load_student(&tx, id)?.ok_or_else(|| RepoError::StudentNotFound(id.clone()))?;
        student.apply(patch);
        student.validate()?;
        write_student(&tx, &student)?;
        tx.commit()?;
        Ok(student)
    }

    fn mark_paid(&self, id: &StudentId, paid: bool) -> RepoResult<Student> {
        let tx = self.immediate()?;
        let mut student =
            load_student(&tx, id)?.ok_or_else(|| RepoError::StudentNotFound(id.clone()))?;
        student.fees_paid = if paid { student.fees_total } else { 0 };
        write_student(&tx, &student)?;
        tx.commit()?;
        Ok(student)
    }

    fn add_payment(&self, id: &StudentId, amount: i64) -> RepoResult<Student> {
        if amount < 0 {
            return Err(ValidationError::NegativeAmount {
                field: "payment",
                value: amount,
            }
            .into());
        }

        let tx = self.immediate()?;
        let mut student =
            load_student(&tx, id)?.ok_or_else(|| RepoError::StudentNotFound(id.clone()))?;
        student.fees_paid = student.fees_paid.checked_add(amount).ok_or_else(|| {
            RepoError::InvalidData(format!("fees_paid overflow for student {id}"))
        })?;
        write_student(&tx, &student)?;
        tx.commit()?;
        Ok(student)
    }

    fn get_student(&self, id: &StudentId) -> RepoResult<Option<Student>> {
        load_student(self.conn, id)
    }

    fn list_students(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STUDENT_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, student_id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn delete_student(&self, id: &StudentId) -> RepoResult<usize> {
        let tx = self.immediate()?;
        let removed_facts = tx.execute(
            "DELETE FROM assignments WHERE student_id = ?1;",
            [id.as_str()],
        )?;
        let changed = tx.execute("DELETE FROM students WHERE student_id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::StudentNotFound(id.clone()));
        }
        tx.commit()?;
        Ok(removed_facts)
    }

    fn create_driver(&self, driver: &Driver) -> RepoResult<()> {
        insert_driver(self.conn, driver)
    }

    fn patch_driver(&self, id: DriverId, patch: &DriverPatch) -> RepoResult<Driver> {
        let tx = self.immediate()?;
        let mut driver = load_driver(&tx, id)?.ok_or(RepoError::DriverNotFound(id))?;
        driver.apply(patch);
        driver.validate()?;
        tx.execute(
            "UPDATE drivers
             SET
                name = ?2,
                vehicle = ?3,
                phone = ?4,
                capacity = ?5,
                service_area = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE driver_id = ?1;",
            params![
                id.to_string(),
                driver.name.trim(),
                driver.vehicle.as_deref(),
                driver.phone.as_deref(),
                i64::from(driver.capacity),
                driver.service_area.as_deref(),
            ],
        )?;
        tx.commit()?;
        Ok(driver)
    }

    fn get_driver(&self, id: DriverId) -> RepoResult<Option<Driver>> {
        load_driver(self.conn, id)
    }

    fn list_drivers(&self) -> RepoResult<Vec<Driver>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DRIVER_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, driver_id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut drivers = Vec::new();
        while let Some(row) = rows.next()? {
            drivers.push(parse_driver_row(row)?);
        }
        Ok(drivers)
    }

    fn delete_driver(&self, id: DriverId) -> RepoResult<usize> {
        let id_text = id.to_string();
        let tx = self.immediate()?;
        let removed_facts = tx.execute(
            "DELETE FROM assignments WHERE driver_id = ?1;",
            [id_text.as_str()],
        )?;
        let changed = tx.execute(
            "DELETE FROM drivers WHERE driver_id = ?1;",
            [id_text.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::DriverNotFound(id));
        }
        tx.commit()?;
        Ok(removed_facts)
    }

    fn seed_if_empty(&self, students: &[Student], drivers: &[Driver]) -> RepoResult<bool> {
        let tx = self.immediate()?;
        if !registry_is_empty(&tx)? {
            return Ok(false);
        }
        for student in students {
            insert_student(&tx, student)?;
        }
        for driver in drivers {
            insert_driver(&tx, driver)?;
        }
        tx.commit()?;
        Ok(true)
    }
}

fn insert_student(conn: &Connection, student: &Student) -> RepoResult<()> {
    student.validate()?;

    let (latitude, longitude) = split_location(student.location);
    let changed = conn.execute(
        "INSERT INTO students (
            student_id,
            name,
            area,
            phone,
            latitude,
            longitude,
            fees_total,
            fees_paid,
            status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(student_id) DO NOTHING;",
        params![
            student.student_id.as_str(),
            student.name.trim(),
            student.area.as_deref(),
            student.phone.as_deref(),
            latitude,
            longitude,
            student.fees_total,
            student.fees_paid,
            student.status.as_str(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::DuplicateStudent(student.student_id.clone()));
    }
    Ok(())
}

fn insert_driver(conn: &Connection, driver: &Driver) -> RepoResult<()> {
    driver.validate()?;

    let changed = conn.execute(
        "INSERT INTO drivers (
            driver_id,
            name,
            vehicle,
            phone,
            capacity,
            service_area
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(driver_id) DO NOTHING;",
        params![
            driver.driver_id.to_string(),
            driver.name.trim(),
            driver.vehicle.as_deref(),
            driver.phone.as_deref(),
            i64::from(driver.capacity),
            driver.service_area.as_deref(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::DuplicateDriver(driver.driver_id));
    }
    Ok(())
}

fn registry_is_empty(conn: &Connection) -> RepoResult<bool> {
    let total: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM students) + (SELECT COUNT(*) FROM drivers);",
        [],
        |row| row.get(0),
    )?;
    Ok(total == 0)
}

fn load_student(conn: &Connection, id: &StudentId) -> RepoResult<Option<Student>> {
    let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} WHERE student_id = ?1;"))?;
    let mut rows = stmt.query([id.as_str()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_student_row(row)?));
    }
    Ok(None)
}

fn write_student(conn: &Connection, student: &Student) -> RepoResult<()> {
    let (latitude, longitude) = split_location(student.location);
    conn.execute(
        "UPDATE students
         SET
            name = ?2,
            area = ?3,
            phone = ?4,
            latitude = ?5,
            longitude = ?6,
            fees_total = ?7,
            fees_paid = ?8,
            status = ?9,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE student_id = ?1;",
        params![
            student.student_id.as_str(),
            student.name.trim(),
            student.area.as_deref(),
            student.phone.as_deref(),
            latitude,
            longitude,
            student.fees_total,
            student.fees_paid,
            student.status.as_str(),
        ],
    )?;
    Ok(())
}

fn load_driver(conn: &Connection, id: DriverId) -> RepoResult<Option<Driver>> {
    let mut stmt = conn.prepare(&format!("{DRIVER_SELECT_SQL} WHERE driver_id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_driver_row(row)?));
    }
    Ok(None)
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("student_id")?;
    let student_id = StudentId::new(id_text.as_str()).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid student id `{id_text}` in students.student_id"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = StudentStatus::parse(&status_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid student status `{status_text}` in students.status"
        ))
    })?;

    let location = match (
        row.get::<_, Option<f64>>("latitude")?,
        row.get::<_, Option<f64>>("longitude")?,
    ) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        (None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "student {student_id} has a partial location"
            )));
        }
    };

    let student = Student {
        student_id,
        name: row.get("name")?,
        area: row.get("area")?,
        phone: row.get("phone")?,
        location,
        fees_total: row.get("fees_total")?,
        fees_paid: row.get("fees_paid")?,
        status,
    };
    student.validate()?;
    Ok(student)
}

fn parse_driver_row(row: &Row<'_>) -> RepoResult<Driver> {
    let id_text: String = row.get("driver_id")?;
    let driver_id = parse_driver_id(&id_text)?;

    let raw_capacity: i64 = row.get("capacity")?;
    let capacity = u32::try_from(raw_capacity)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid capacity `{raw_capacity}` in drivers.capacity"
            ))
        })?;

    Ok(Driver {
        driver_id,
        name: row.get("name")?,
        vehicle: row.get("vehicle")?,
        phone: row.get("phone")?,
        capacity,
        service_area: row.get("service_area")?,
    })
}

pub(crate) fn parse_driver_id(value: &str) -> RepoResult<DriverId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid driver id `{value}`")))
}

fn split_location(location: Option<GeoPoint>) -> (Option<f64>, Option<f64>) {
    match location {
        Some(point) => (Some(point.lat), Some(point.lon)),
        None => (None, None),
    }
}

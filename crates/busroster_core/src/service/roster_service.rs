//! Roster use-case service.
//!
//! # Responsibility
//! - Provide registration, edit, payment and removal entry points for the
//!   student/driver registry.
//! - Return read-back snapshots so callers never hold live state.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Removals cascade to ledger facts atomically (delegated to the repository).

use crate::model::driver::{Driver, DriverId, DriverPatch};
use crate::model::student::{Student, StudentId, StudentPatch, StudentStatus};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::roster_repo::RosterRepository;
use log::{info, warn};

/// Use-case service wrapper for roster operations.
pub struct RosterService<R: RosterRepository> {
    repo: R,
}

impl<R: RosterRepository> RosterService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a student and returns the stored snapshot.
    pub fn add_student(&self, student: &Student) -> RepoResult<Student> {
        if let Err(err) = self.repo.create_student(student) {
            warn!(
                "event=student_add module=roster status=rejected error_code={}",
                err.code()
            );
            return Err(err);
        }
        info!("event=student_add module=roster status=ok");
        self.read_back_student(&student.student_id, "created student missing in read-back")
    }

    /// Registers a driver and returns the stored snapshot.
    pub fn add_driver(&self, driver: &Driver) -> RepoResult<Driver> {
        if let Err(err) = self.repo.create_driver(driver) {
            warn!(
                "event=driver_add module=roster status=rejected error_code={}",
                err.code()
            );
            return Err(err);
        }
        info!(
            "event=driver_add module=roster status=ok driver_id={} capacity={}",
            driver.driver_id, driver.capacity
        );
        self.repo
            .get_driver(driver.driver_id)?
            .ok_or_else(|| RepoError::InvalidData("created driver missing in read-back".into()))
    }

    /// Applies a partial student edit.
    pub fn update_student(&self, id: &StudentId, patch: &StudentPatch) -> RepoResult<Student> {
        if patch.is_empty() {
            return self
                .repo
                .get_student(id)?
                .ok_or_else(|| RepoError::StudentNotFound(id.clone()));
        }
        self.repo.patch_student(id, patch)
    }

    /// Applies a partial driver edit.
    ///
    /// A capacity cut does not touch assignments already committed.
    pub fn update_driver(&self, id: DriverId, patch: &DriverPatch) -> RepoResult<Driver> {
        let updated = self.repo.patch_driver(id, patch)?;
        if patch.capacity.is_some() {
            info!(
                "event=driver_capacity module=roster status=ok driver_id={} capacity={}",
                id, updated.capacity
            );
        }
        Ok(updated)
    }

    /// Marks a student as fully paid or resets the paid amount to zero.
    pub fn set_payment_status(&self, id: &StudentId, paid: bool) -> RepoResult<Student> {
        self.repo.mark_paid(id, paid)
    }

    /// Records a payment on top of what was already paid.
    pub fn record_payment(&self, id: &StudentId, amount: i64) -> RepoResult<Student> {
        self.repo.add_payment(id, amount)
    }

    /// Changes lifecycle status (soft removal keeps history intact).
    pub fn set_status(&self, id: &StudentId, status: StudentStatus) -> RepoResult<Student> {
        self.repo.patch_student(
            id,
            &StudentPatch {
                status: Some(status),
                ..StudentPatch::default()
            },
        )
    }

    /// Removes a student and every ledger fact referencing it.
    pub fn remove_student(&self, id: &StudentId) -> RepoResult<usize> {
        let removed_facts = self.repo.delete_student(id)?;
        info!("event=student_remove module=roster status=ok removed_facts={removed_facts}");
        Ok(removed_facts)
    }

    /// Removes a driver and every ledger fact referencing it.
    pub fn remove_driver(&self, id: DriverId) -> RepoResult<usize> {
        let removed_facts = self.repo.delete_driver(id)?;
        info!(
            "event=driver_remove module=roster status=ok driver_id={id} removed_facts={removed_facts}"
        );
        Ok(removed_facts)
    }

    pub fn get_student(&self, id: &StudentId) -> RepoResult<Option<Student>> {
        self.repo.get_student(id)
    }

    pub fn get_driver(&self, id: DriverId) -> RepoResult<Option<Driver>> {
        self.repo.get_driver(id)
    }

    /// Snapshot of all students ordered by name.
    pub fn list_students(&self) -> RepoResult<Vec<Student>> {
        self.repo.list_students()
    }

    /// Snapshot of all drivers ordered by name.
    pub fn list_drivers(&self) -> RepoResult<Vec<Driver>> {
        self.repo.list_drivers()
    }

    /// Inserts a small demo roster when nothing is registered yet.
    ///
    /// Returns `true` when rows were inserted. The seed is all-or-nothing.
    pub fn seed_demo_roster(&self) -> RepoResult<bool> {
        let mut students = Vec::new();
        for (code, name, area, phone, paid) in [
            ("101", "Noura", "Al Rawdah", "0501234567", false),
            ("102", "Sara", "Al Malqa", "0559876543", true),
            ("103", "Layan", "Al Narjis", "0581112233", false),
        ] {
            let mut student = Student::new(StudentId::new(code)?, name);
            student.area = Some(area.to_string());
            student.phone = Some(phone.to_string());
            student.fees_total = DEMO_TERM_FEE;
            student.fees_paid = if paid { DEMO_TERM_FEE } else { 0 };
            students.push(student);
        }

        let drivers = [
            ("Ahmed Mohammed", "Bus 1", "0591112233", 15),
            ("Khalid Ali", "Bus 2", "0584445566", 12),
        ]
        .into_iter()
        .map(|(name, vehicle, phone, capacity)| {
            let mut driver = Driver::new(name);
            driver.vehicle = Some(vehicle.to_string());
            driver.phone = Some(phone.to_string());
            driver.capacity = capacity;
            driver
        })
        .collect::<Vec<_>>();

        if !self.repo.seed_if_empty(&students, &drivers)? {
            return Ok(false);
        }
        info!(
            "event=roster_seed module=roster status=ok students={} drivers={}",
            students.len(),
            drivers.len()
        );
        Ok(true)
    }

    fn read_back_student(&self, id: &StudentId, context: &'static str) -> RepoResult<Student> {
        self.repo
            .get_student(id)?
            .ok_or_else(|| RepoError::InvalidData(context.to_string()))
    }
}

/// Term fee used by the demo roster, in minor currency units.
const DEMO_TERM_FEE: i64 = 5000;

//! Daily assignment ledger service.
//!
//! # Responsibility
//! - Expose replace-set assignment writes and ledger reads to callers.
//! - Emit metadata-only ledger events (ids and counts, never names).
//!
//! # Invariants
//! - `set_*` calls submit a full replacement set, never a diff.
//! - Trip-less calls operate on `TripType::default()` (the single-trip model).
//! - Reads of absent keys return empty sets, never errors.

use crate::model::assignment::{AssignmentSet, ServiceDate, TripType};
use crate::model::driver::DriverId;
use crate::model::student::StudentId;
use crate::repo::error::RepoResult;
use crate::repo::ledger_repo::{LedgerRepository, ReplaceOutcome};
use log::{info, warn};
use std::collections::BTreeMap;

/// Use-case service for the daily assignment ledger.
pub struct LedgerService<L: LedgerRepository> {
    repo: L,
}

impl<L: LedgerRepository> LedgerService<L> {
    pub fn new(repo: L) -> Self {
        Self { repo }
    }

    /// Replaces the students riding with `driver_id` on `date`.
    pub fn set_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        student_ids: &AssignmentSet,
    ) -> RepoResult<ReplaceOutcome> {
        self.set_trip_assignment(date, driver_id, TripType::default(), student_ids)
    }

    /// Replaces the students riding with `driver_id` on one trip leg of `date`.
    ///
    /// # Errors
    /// - `CapacityExceeded` when the set is larger than the driver's capacity.
    /// - `UnknownDriver` / `UnknownStudent` for unregistered references.
    /// - `AssignmentConflict` when a student already rides another driver on
    ///   the same date and trip.
    ///
    /// No partial write happens on any error.
    pub fn set_trip_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: TripType,
        student_ids: &AssignmentSet,
    ) -> RepoResult<ReplaceOutcome> {
        match self
            .repo
            .replace_assignment(date, driver_id, trip, student_ids)
        {
            Ok(outcome) => {
                info!(
                    "event=ledger_set module=ledger status=ok date={} driver_id={} trip={} requested={} added={} removed={}",
                    date,
                    driver_id,
                    trip.as_str(),
                    student_ids.len(),
                    outcome.added,
                    outcome.removed
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    "event=ledger_set module=ledger status=rejected date={} driver_id={} trip={} requested={} error_code={}",
                    date,
                    driver_id,
                    trip.as_str(),
                    student_ids.len(),
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Students riding with `driver_id` on `date` (default trip).
    pub fn get_assignment(&self, date: ServiceDate, driver_id: DriverId) -> RepoResult<AssignmentSet> {
        self.repo
            .get_assignment(date, driver_id, Some(TripType::default()))
    }

    /// Students riding with `driver_id` on `date`; `trip = None` merges legs.
    pub fn get_trip_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: Option<TripType>,
    ) -> RepoResult<AssignmentSet> {
        self.repo.get_assignment(date, driver_id, trip)
    }

    /// Driver to students mapping for `date` (default trip).
    pub fn get_assignments_for_date(
        &self,
        date: ServiceDate,
    ) -> RepoResult<BTreeMap<DriverId, AssignmentSet>> {
        self.repo.list_for_date(date, Some(TripType::default()))
    }

    /// Driver to students mapping for `date`; `trip = None` merges legs.
    pub fn get_trip_assignments_for_date(
        &self,
        date: ServiceDate,
        trip: Option<TripType>,
    ) -> RepoResult<BTreeMap<DriverId, AssignmentSet>> {
        self.repo.list_for_date(date, trip)
    }

    /// Whether the student rides with any driver, on any trip, on `date`.
    pub fn is_student_assigned(&self, date: ServiceDate, student_id: &StudentId) -> RepoResult<bool> {
        self.repo.is_student_assigned(date, student_id)
    }

    /// Clears the default-trip set for `(date, driver_id)`. Idempotent.
    pub fn remove_assignment(&self, date: ServiceDate, driver_id: DriverId) -> RepoResult<usize> {
        self.remove_trip_assignment(date, driver_id, Some(TripType::default()))
    }

    /// Clears one trip (or all trips with `None`) for `(date, driver_id)`.
    pub fn remove_trip_assignment(
        &self,
        date: ServiceDate,
        driver_id: DriverId,
        trip: Option<TripType>,
    ) -> RepoResult<usize> {
        let removed = self.repo.clear_assignment(date, driver_id, trip)?;
        info!(
            "event=ledger_clear module=ledger status=ok date={} driver_id={} trip={} removed={}",
            date,
            driver_id,
            trip.map_or("all", TripType::as_str),
            removed
        );
        Ok(removed)
    }

    /// Distinct dates the student was assigned, ascending.
    pub fn assigned_dates(&self, student_id: &StudentId) -> RepoResult<Vec<ServiceDate>> {
        self.repo.assigned_dates(student_id, None)
    }
}

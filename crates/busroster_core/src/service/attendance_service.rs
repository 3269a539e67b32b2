//! Attendance aggregation over the assignment ledger.
//!
//! Attendance is a derived value: the number of distinct service dates a
//! student has at least one assignment fact for. Nothing here is stored.

use crate::model::assignment::DateRange;
use crate::model::student::StudentId;
use crate::repo::error::RepoResult;
use crate::repo::ledger_repo::LedgerRepository;
use std::collections::BTreeMap;

/// Read-only attendance projections.
pub struct AttendanceService<L: LedgerRepository> {
    repo: L,
}

impl<L: LedgerRepository> AttendanceService<L> {
    pub fn new(repo: L) -> Self {
        Self { repo }
    }

    /// Distinct dates with an assignment. `0` for never-assigned students.
    pub fn attendance_days(&self, student_id: &StudentId) -> RepoResult<u32> {
        self.repo.count_attendance_days(student_id, None)
    }

    /// Distinct dates with an assignment inside an inclusive range.
    pub fn attendance_days_between(
        &self,
        student_id: &StudentId,
        range: DateRange,
    ) -> RepoResult<u32> {
        self.repo.count_attendance_days(student_id, Some(range))
    }

    /// Attendance for every registered student in one pass.
    pub fn attendance_days_all(&self) -> RepoResult<BTreeMap<StudentId, u32>> {
        self.repo.attendance_days_by_student()
    }
}

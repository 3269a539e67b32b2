//! Repository error taxonomy.

use crate::db::DbError;
use crate::model::assignment::{ServiceDate, TripType};
use crate::model::driver::DriverId;
use crate::model::student::StudentId;
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for roster and ledger persistence operations.
///
/// Every variant except `Db` and `InvalidData` is a client error: the
/// operation did not take effect and stored state is unchanged.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    DuplicateStudent(StudentId),
    DuplicateDriver(DriverId),
    StudentNotFound(StudentId),
    DriverNotFound(DriverId),
    /// Assignment references a driver that is not registered.
    UnknownDriver(DriverId),
    /// Assignment references a student that is not registered.
    UnknownStudent(StudentId),
    CapacityExceeded {
        driver_id: DriverId,
        requested: usize,
        capacity: u32,
    },
    /// Student already rides another driver on the same date and trip.
    AssignmentConflict {
        student_id: StudentId,
        service_date: ServiceDate,
        trip: TripType,
        assigned_driver: DriverId,
    },
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl RepoError {
    /// Stable machine-readable code for callers that render errors.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Db(_) => "db_error",
            Self::DuplicateStudent(_) | Self::DuplicateDriver(_) => "duplicate_id",
            Self::StudentNotFound(_) | Self::DriverNotFound(_) => "not_found",
            Self::UnknownDriver(_) | Self::UnknownStudent(_) => "unknown_reference",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::AssignmentConflict { .. } => "assignment_conflict",
            Self::UninitializedConnection { .. } | Self::MissingRequiredTable(_) => {
                "db_uninitialized"
            }
            Self::InvalidData(_) => "invalid_data",
        }
    }

    /// Whether the failure was caused by caller input rather than storage.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Db(_)
                | Self::UninitializedConnection { .. }
                | Self::MissingRequiredTable(_)
                | Self::InvalidData(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateStudent(id) => write!(f, "student already exists: {id}"),
            Self::DuplicateDriver(id) => write!(f, "driver already exists: {id}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::DriverNotFound(id) => write!(f, "driver not found: {id}"),
            Self::UnknownDriver(id) => write!(f, "assignment references unknown driver: {id}"),
            Self::UnknownStudent(id) => {
                write!(f, "assignment references unknown student: {id}")
            }
            Self::CapacityExceeded {
                driver_id,
                requested,
                capacity,
            } => write!(
                f,
                "driver {driver_id} capacity exceeded: requested {requested}, capacity {capacity}"
            ),
            Self::AssignmentConflict {
                student_id,
                service_date,
                trip,
                assigned_driver,
            } => write!(
                f,
                "student {student_id} already assigned to driver {assigned_driver} on {service_date} ({})",
                trip.as_str()
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

//! Roster and ledger domain model.
//!
//! # Responsibility
//! - Define canonical records for students, drivers and assignment facts.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Students are identified by a caller-supplied code that never changes.
//! - Drivers are identified by a stable `DriverId` (UUID).
//! - Attendance is always derived from assignment facts, never stored.

pub mod assignment;
pub mod driver;
pub mod student;
pub mod validation;

//! Driver domain model.
//!
//! # Invariants
//! - `driver_id` is stable and never reused for another driver.
//! - `capacity` is at least one seat.
//! - Lowering `capacity` does not rewrite assignments committed earlier.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a driver (and the vehicle they operate).
pub type DriverId = Uuid;

/// Seat count used when a driver is registered without one.
pub const DEFAULT_DRIVER_CAPACITY: u32 = 14;

/// Registered driver and vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: DriverId,
    pub name: String,
    /// Vehicle label shown to operators, e.g. `Bus 1`.
    pub vehicle: Option<String>,
    pub phone: Option<String>,
    /// Maximum number of students per service date and trip.
    pub capacity: u32,
    pub service_area: Option<String>,
}

impl Driver {
    /// Creates a driver with a generated stable ID and default capacity.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a driver with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(driver_id: DriverId, name: impl Into<String>) -> Self {
        Self {
            driver_id,
            name: name.into(),
            vehicle: None,
            phone: None,
            capacity: DEFAULT_DRIVER_CAPACITY,
            service_area: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { record: "driver" });
        }
        if self.capacity == 0 {
            return Err(ValidationError::NonPositiveCapacity(0));
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: &DriverPatch) {
        if let Some(name) = patch.name.as_ref() {
            self.name = name.trim().to_string();
        }
        if let Some(vehicle) = patch.vehicle.as_ref() {
            self.vehicle = vehicle.clone();
        }
        if let Some(phone) = patch.phone.as_ref() {
            self.phone = phone.clone();
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(service_area) = patch.service_area.as_ref() {
            self.service_area = service_area.clone();
        }
    }
}

/// Partial update for a driver. `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverPatch {
    pub name: Option<String>,
    pub vehicle: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub capacity: Option<u32>,
    pub service_area: Option<Option<String>>,
}

//! Trip repository port.
//!
//! The booking subsystem owns trips. Dispatch reads them and performs
//! exactly one write: setting the winning driver.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, DriverId, TripId};
use crate::domain::trip::Trip;

/// Result of the conditional assignment write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentResult {
    /// The row had no driver and now has this one.
    Assigned,
    /// The row already carried a driver; nothing was written.
    AlreadyAssignedTo(DriverId),
}

/// Repository port for the trip rows dispatch touches.
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Find a trip by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, DomainError>;

    /// Set `driver_id` and move the trip to `Assigned`, only if no driver
    /// is set yet.
    ///
    /// Must be a single conditional write so a second caller can never
    /// overwrite the first.
    ///
    /// # Errors
    ///
    /// - `TripNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn assign_driver(
        &self,
        trip_id: &TripId,
        driver_id: &DriverId,
    ) -> Result<AssignmentResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn TripRepository) {}
    }
}

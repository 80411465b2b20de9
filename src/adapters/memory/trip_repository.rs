//! In-memory trip store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, DriverId, ErrorCode, TripId};
use crate::domain::trip::{Trip, TripStatus};
use crate::ports::{AssignmentResult, TripRepository};

/// Mutex-guarded map of trips.
///
/// `assign_driver` does the same conditional write the SQL adapter does:
/// it only succeeds while no driver is set. Tests can make the next N
/// assignment writes fail, or land and then report failure.
#[derive(Default)]
pub struct InMemoryTripRepository {
    trips: Mutex<HashMap<TripId, Trip>>,
    failures_pending: AtomicU32,
    lost_acks_pending: AtomicU32,
    assign_calls: AtomicU32,
}

impl InMemoryTripRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a trip.
    pub async fn insert(&self, trip: Trip) {
        self.trips.lock().await.insert(trip.id, trip);
    }

    pub async fn get(&self, id: &TripId) -> Option<Trip> {
        self.trips.lock().await.get(id).cloned()
    }

    /// Marks a trip cancelled on the booking side.
    pub async fn mark_cancelled(&self, id: &TripId) -> bool {
        match self.trips.lock().await.get_mut(id) {
            Some(trip) => {
                trip.status = TripStatus::Cancelled;
                true
            }
            None => false,
        }
    }

    /// The next `count` calls to `assign_driver` fail with a database error.
    pub fn fail_next_assignments(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// The next `count` successful writes are stored but reported as errors.
    pub fn lose_next_acknowledgements(&self, count: u32) {
        self.lost_acks_pending.store(count, Ordering::SeqCst);
    }

    /// Number of `assign_driver` calls seen, failed ones included.
    pub fn assign_calls(&self) -> u32 {
        self.assign_calls.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        take_one(&self.failures_pending)
    }
}

fn take_one(pending: &AtomicU32) -> bool {
    pending
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, DomainError> {
        Ok(self.get(id).await)
    }

    async fn assign_driver(
        &self,
        trip_id: &TripId,
        driver_id: &DriverId,
    ) -> Result<AssignmentResult, DomainError> {
        self.assign_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_injected_failure() {
            return Err(DomainError::database("injected assignment failure"));
        }

        let mut trips = self.trips.lock().await;
        let trip = trips.get_mut(trip_id).ok_or_else(|| {
            DomainError::new(ErrorCode::TripNotFound, format!("Trip not found: {}", trip_id))
        })?;

        match trip.driver_id {
            Some(existing) => Ok(AssignmentResult::AlreadyAssignedTo(existing)),
            None => {
                trip.driver_id = Some(*driver_id);
                trip.status = TripStatus::Assigned;
                if take_one(&self.lost_acks_pending) {
                    return Err(DomainError::database("connection lost after commit"));
                }
                Ok(AssignmentResult::Assigned)
            }
        }
    }
}

//! In-memory offer audit log.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::dispatch::{DispatchSequence, OfferShown};
use crate::domain::foundation::{DomainError, DriverId, TripId};
use crate::ports::OfferAuditLog;

#[derive(Default)]
struct AuditState {
    entries: Vec<OfferShown>,
    keys: HashSet<(TripId, DispatchSequence, DriverId)>,
}

/// Append-only list of "offer shown" rows.
///
/// Keyed like the SQL table: a second record for the same
/// (trip, sequence, driver) is ignored.
#[derive(Default)]
pub struct InMemoryOfferAuditLog {
    state: Mutex<AuditState>,
}

impl InMemoryOfferAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<OfferShown> {
        self.state.lock().await.entries.clone()
    }

    pub async fn entries_for(&self, trip_id: &TripId) -> Vec<OfferShown> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| &e.trip_id == trip_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OfferAuditLog for InMemoryOfferAuditLog {
    async fn record_shown(&self, entry: OfferShown) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state
            .keys
            .insert((entry.trip_id, entry.sequence, entry.driver_id))
        {
            state.entries.push(entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn shown(trip_id: TripId, driver_id: DriverId, seq: u64) -> OfferShown {
        OfferShown {
            trip_id,
            driver_id,
            sequence: DispatchSequence::new(seq),
            distance_km: 4.2,
            estimated_earnings: 4500,
            shown_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_rows_are_ignored() {
        let log = InMemoryOfferAuditLog::new();
        let (trip, driver) = (TripId::new(), DriverId::new());

        log.record_shown(shown(trip, driver, 1)).await.unwrap();
        log.record_shown(shown(trip, driver, 1)).await.unwrap();
        log.record_shown(shown(trip, driver, 2)).await.unwrap();

        assert_eq!(log.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn entries_for_filters_by_trip() {
        let log = InMemoryOfferAuditLog::new();
        let trip = TripId::new();

        log.record_shown(shown(trip, DriverId::new(), 1))
            .await
            .unwrap();
        log.record_shown(shown(TripId::new(), DriverId::new(), 1))
            .await
            .unwrap();

        assert_eq!(log.entries_for(&trip).await.len(), 1);
    }
}

//! Recording notification sink.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::dispatch::TripStatusUpdate;
use crate::domain::foundation::{DomainError, TripId};
use crate::ports::NotificationSink;

/// Keeps every status update it is handed.
#[derive(Default)]
pub struct InMemoryNotificationSink {
    updates: Mutex<Vec<TripStatusUpdate>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn updates(&self) -> Vec<TripStatusUpdate> {
        self.updates.lock().await.clone()
    }

    pub async fn updates_for(&self, trip_id: &TripId) -> Vec<TripStatusUpdate> {
        self.updates
            .lock()
            .await
            .iter()
            .filter(|u| &u.trip_id == trip_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn notify(&self, update: TripStatusUpdate) -> Result<(), DomainError> {
        self.updates.lock().await.push(update);
        Ok(())
    }
}

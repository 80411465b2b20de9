//! Notification fan-out and a log-only sink.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::dispatch::TripStatusUpdate;
use crate::domain::foundation::DomainError;
use crate::ports::NotificationSink;

/// Writes each status update to the log. Stands in for push, email and SMS
/// until those are wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, update: TripStatusUpdate) -> Result<(), DomainError> {
        tracing::info!(
            trip_id = %update.trip_id,
            sequence = %update.sequence,
            outcome = ?update.outcome,
            "trip status update"
        );
        Ok(())
    }
}

/// Delivers to every inner sink. One failing sink does not stop the others;
/// the first error is returned after all have run.
pub struct FanoutNotificationSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotificationSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutNotificationSink {
    async fn notify(&self, update: TripStatusUpdate) -> Result<(), DomainError> {
        let results = futures::future::join_all(
            self.sinks.iter().map(|sink| sink.notify(update.clone())),
        )
        .await;
        results.into_iter().collect::<Result<Vec<_>, _>>().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryNotificationSink;
    use crate::domain::dispatch::{DispatchSequence, OfferOutcome};
    use crate::domain::foundation::{Timestamp, TripId};

    #[tokio::test]
    async fn fanout_reaches_every_sink() {
        let a = Arc::new(InMemoryNotificationSink::new());
        let b = Arc::new(InMemoryNotificationSink::new());
        let fanout = FanoutNotificationSink::new(vec![
            a.clone(),
            Arc::new(LoggingNotificationSink),
            b.clone(),
        ]);

        fanout
            .notify(TripStatusUpdate {
                trip_id: TripId::new(),
                sequence: DispatchSequence::new(1),
                outcome: OfferOutcome::Cancelled,
                occurred_at: Timestamp::now(),
            })
            .await
            .unwrap();

        assert_eq!(a.updates().await.len(), 1);
        assert_eq!(b.updates().await.len(), 1);
    }
}

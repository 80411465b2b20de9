//! In-memory event bus.
//!
//! Captures published envelopes for assertions and fans them out to live
//! subscribers over a `broadcast` channel. Capture is bounded: once
//! `retention` envelopes are held, the oldest is dropped.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

const DEFAULT_RETENTION: usize = 10_000;
const SUBSCRIBER_CAPACITY: usize = 256;

/// In-memory event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
/// assert!(bus.has_event("trip.assigned.v1"));
/// ```
pub struct InMemoryEventBus {
    published: Mutex<VecDeque<EventEnvelope>>,
    retention: usize,
    stream: broadcast::Sender<EventEnvelope>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        let (stream, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            published: Mutex::new(VecDeque::new()),
            retention: retention.max(1),
            stream,
        }
    }

    /// Live feed of envelopes published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.stream.subscribe()
    }

    fn captured(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        // Nothing panics while holding the lock, so a poisoned guard is still consistent.
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // === Test Helpers ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.captured().iter().cloned().collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.captured()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.captured()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.captured().clear();
    }

    pub fn event_count(&self) -> usize {
        self.captured().len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.captured().iter().any(|e| e.event_type == event_type)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            correlation_id = ?event.metadata.correlation_id,
            "domain event published"
        );
        {
            let mut captured = self.captured();
            if captured.len() == self.retention {
                captured.pop_front();
            }
            captured.push_back(event.clone());
        }
        // No subscribers is fine.
        let _ = self.stream.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};
    use serde_json::json;

    fn test_envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            schema_version: 1,
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: "Trip".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({}),
            metadata: EventMetadata::default(),
        }
    }

    #[tokio::test]
    async fn publish_stores_event() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("trip.assigned.v1", "trip-1"))
            .await
            .unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("trip.assigned.v1"));
    }

    #[tokio::test]
    async fn events_of_type_filters_correctly() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("type.a", "1")).await.unwrap();
        bus.publish(test_envelope("type.b", "2")).await.unwrap();
        bus.publish(test_envelope("type.a", "3")).await.unwrap();

        assert_eq!(bus.events_of_type("type.a").len(), 2);
        assert_eq!(bus.events_for_aggregate("2").len(), 1);
    }

    #[tokio::test]
    async fn retention_drops_oldest() {
        let bus = InMemoryEventBus::with_retention(2);

        bus.publish(test_envelope("type.a", "1")).await.unwrap();
        bus.publish(test_envelope("type.a", "2")).await.unwrap();
        bus.publish(test_envelope("type.a", "3")).await.unwrap();

        let ids: Vec<_> = bus
            .published_events()
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn subscribers_receive_live_events() {
        let bus = InMemoryEventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(test_envelope("trip.offer_cycle.expired.v1", "t"))
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "trip.offer_cycle.expired.v1");
    }

    #[tokio::test]
    async fn clear_resets_capture() {
        let bus = InMemoryEventBus::new();
        bus.publish(test_envelope("type.a", "1")).await.unwrap();

        bus.clear();

        assert_eq!(bus.event_count(), 0);
    }
}

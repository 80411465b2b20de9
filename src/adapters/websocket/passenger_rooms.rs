//! Passenger rooms keyed by trip.
//!
//! Every passenger (and organizer) watching a trip joins that trip's room
//! and receives its `trip.status.updated` messages.
//!
//! ```text
//! Room: trip-123       Room: trip-456
//! ├── client-a         ├── client-d
//! └── client-b         └── client-e
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::dispatch::TripStatusUpdate;
use crate::domain::foundation::{DomainError, TripId};
use crate::ports::NotificationSink;

/// Server-side id for one passenger socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trip-scoped broadcast rooms.
///
/// `RwLock` on the registry: publishes (reads) far outnumber joins and
/// leaves (writes).
pub struct PassengerRooms {
    rooms: RwLock<HashMap<TripId, broadcast::Sender<TripStatusUpdate>>>,
    client_trips: RwLock<HashMap<ClientId, TripId>>,
    channel_capacity: usize,
}

impl PassengerRooms {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_trips: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(64)
    }

    /// Joins a client to the trip's room, creating it on first use.
    pub async fn join(
        &self,
        trip_id: &TripId,
        client_id: ClientId,
    ) -> broadcast::Receiver<TripStatusUpdate> {
        let mut rooms = self.rooms.write().await;
        let sender = rooms.entry(*trip_id).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        self.client_trips.write().await.insert(client_id, *trip_id);

        sender.subscribe()
    }

    /// Removes a client; an emptied room is dropped.
    ///
    /// Call after the client's receiver has been dropped.
    pub async fn leave(&self, client_id: &ClientId) {
        let Some(trip_id) = self.client_trips.write().await.remove(client_id) else {
            return;
        };
        let mut rooms = self.rooms.write().await;
        if rooms
            .get(&trip_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            rooms.remove(&trip_id);
        }
    }

    /// Sends to everyone in the trip's room. No room, no-op.
    pub async fn publish(&self, update: TripStatusUpdate) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .get(&update.trip_id)
            .and_then(|sender| sender.send(update).ok())
            .unwrap_or(0)
    }

    pub async fn client_count(&self, trip_id: &TripId) -> usize {
        self.rooms
            .read()
            .await
            .get(trip_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    pub async fn active_rooms(&self) -> Vec<TripId> {
        self.rooms.read().await.keys().copied().collect()
    }
}

impl Default for PassengerRooms {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl NotificationSink for PassengerRooms {
    async fn notify(&self, update: TripStatusUpdate) -> Result<(), DomainError> {
        let trip_id = update.trip_id;
        let delivered = self.publish(update).await;
        tracing::debug!(%trip_id, delivered, "trip status pushed to passenger room");
        Ok(())
    }
}

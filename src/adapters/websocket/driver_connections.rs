//! Per-driver outbound queues backing the `DriverChannel` port.
//!
//! Each connected driver owns one bounded queue. The socket task drains it;
//! the dispatch core only ever does a non-blocking `try_send`, so a slow
//! client fills its own queue and nobody else's.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::DriverId;
use crate::ports::{ChannelError, DriverChannel, DriverMessage};

/// Default outbound queue depth per driver.
pub const DEFAULT_DRIVER_QUEUE_CAPACITY: usize = 32;

pub struct DriverConnections {
    queues: RwLock<HashMap<DriverId, mpsc::Sender<DriverMessage>>>,
    capacity: usize,
}

impl DriverConnections {
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Opens a queue for the driver, replacing any earlier connection.
    ///
    /// A replaced connection sees its receiver close and shuts down.
    pub async fn register(&self, driver_id: DriverId) -> mpsc::Receiver<DriverMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        if self.queues.write().await.insert(driver_id, tx).is_some() {
            tracing::debug!(%driver_id, "driver connection replaced");
        }
        rx
    }

    /// Drops the driver's queue once its receiver is gone.
    ///
    /// Call after dropping the receiver. A newer connection for the same
    /// driver still has a live receiver and is left alone.
    pub async fn unregister(&self, driver_id: &DriverId) {
        let mut queues = self.queues.write().await;
        if queues.get(driver_id).is_some_and(|tx| tx.is_closed()) {
            queues.remove(driver_id);
        }
    }

    pub async fn is_connected(&self, driver_id: &DriverId) -> bool {
        self.queues
            .read()
            .await
            .get(driver_id)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    pub async fn connected_count(&self) -> usize {
        self.queues.read().await.len()
    }
}

impl Default for DriverConnections {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVER_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl DriverChannel for DriverConnections {
    async fn send(&self, driver_id: DriverId, message: DriverMessage) -> Result<(), ChannelError> {
        let queues = self.queues.read().await;
        let tx = queues
            .get(&driver_id)
            .ok_or(ChannelError::NotConnected(driver_id))?;
        tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ChannelError::QueueFull(driver_id),
            mpsc::error::TrySendError::Closed(_) => ChannelError::Closed(driver_id),
        })
    }
}

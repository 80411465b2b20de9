//! NotificationSink port - passenger-facing status updates.
//!
//! Push, email, SMS and the passenger WebSocket room are all sinks. The
//! arbiter calls `notify` once per terminal outcome of a cycle.

use async_trait::async_trait;

use crate::domain::dispatch::TripStatusUpdate;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a status change.
    ///
    /// Errors are logged by the caller; they never roll back the outcome.
    async fn notify(&self, update: TripStatusUpdate) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_sink_is_object_safe() {
        fn _accepts_dyn(_sink: &dyn NotificationSink) {}
    }
}

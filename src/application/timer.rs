//! OfferLifecycleTimer - one cancellable countdown per (trip, sequence).
//!
//! The timer delivers a single message into a mailbox when its window
//! elapses. Cancelling aborts the task, so a cancelled timer never fires.
//! A timer that fired just before being cancelled is still harmless: the
//! message carries its sequence and the receiver drops mismatches.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::dispatch::DispatchSequence;
use crate::domain::foundation::TripId;

pub struct OfferLifecycleTimer;

impl OfferLifecycleTimer {
    /// Sends `message` to `mailbox` once `after` has elapsed.
    pub fn schedule<T>(
        trip_id: TripId,
        sequence: DispatchSequence,
        after: Duration,
        mailbox: mpsc::Sender<T>,
        message: T,
    ) -> TimerHandle
    where
        T: Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tracing::debug!(%trip_id, %sequence, "offer window elapsed");
            if mailbox.send(message).await.is_err() {
                tracing::debug!(%trip_id, %sequence, "arbiter gone before timeout delivery");
            }
        });

        TimerHandle {
            trip_id,
            sequence,
            task: Some(task),
        }
    }
}

/// Handle to a scheduled timeout. Dropping it cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    trip_id: TripId,
    sequence: DispatchSequence,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn sequence(&self) -> DispatchSequence {
        self.sequence
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

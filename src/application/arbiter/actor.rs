//! Single-writer actor owning one trip's offer cycles.
//!
//! Commands are processed strictly one at a time in mailbox order, which is
//! what linearizes accept, decline, timeout and cancel for the trip.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::time;

use crate::domain::dispatch::{
    DeclineOutcome, DispatchCycle, DispatchError, DispatchSequence, OfferCycleCancelled,
    OfferCycleExpired, OfferInvalidation, OfferOutcome, TripAssigned, TripStatusUpdate,
};
use crate::domain::foundation::{
    DriverId, ErrorCode, EventEnvelope, EventId, SerializableDomainEvent, Timestamp, TripId,
};
use crate::domain::trip::TripType;
use crate::application::timer::{OfferLifecycleTimer, TimerHandle};
use crate::ports::{AssignmentResult, DriverMessage};

use super::command::{AcceptReceipt, ArbiterCommand};
use super::Shared;

pub(super) struct TripActor {
    trip_id: TripId,
    trip_type: Option<TripType>,
    cycle: Option<DispatchCycle>,
    timer: Option<TimerHandle>,
    mailbox: mpsc::Sender<ArbiterCommand>,
    shared: Arc<Shared>,
}

impl TripActor {
    pub(super) fn new(
        trip_id: TripId,
        mailbox: mpsc::Sender<ArbiterCommand>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            trip_id,
            trip_type: None,
            cycle: None,
            timer: None,
            mailbox,
            shared,
        }
    }

    pub(super) async fn run(mut self, mut inbox: mpsc::Receiver<ArbiterCommand>) {
        tracing::debug!(trip_id = %self.trip_id, "arbiter started");
        loop {
            let next = if self.is_settled() {
                match time::timeout(self.shared.settings.closed_cycle_retention, inbox.recv()).await
                {
                    Ok(next) => next,
                    Err(_) => break,
                }
            } else {
                inbox.recv().await
            };

            match next {
                Some(command) => self.handle(command, false).await,
                None => return,
            }
        }
        self.retire(inbox).await;
    }

    fn is_settled(&self) -> bool {
        self.cycle.as_ref().map_or(true, |cycle| !cycle.is_open())
    }

    /// Leaves the router, then answers whatever was already queued.
    async fn retire(mut self, mut inbox: mpsc::Receiver<ArbiterCommand>) {
        {
            let mut mailboxes = self.shared.mailboxes.lock().await;
            let ours = mailboxes
                .get(&self.trip_id)
                .map_or(false, |tx| tx.same_channel(&self.mailbox));
            if ours {
                mailboxes.remove(&self.trip_id);
            }
        }
        inbox.close();
        while let Some(command) = inbox.recv().await {
            self.handle(command, true).await;
        }
        tracing::debug!(trip_id = %self.trip_id, "arbiter retired");
    }

    async fn handle(&mut self, command: ArbiterCommand, retiring: bool) {
        match command {
            ArbiterCommand::OpenCycle {
                trip_type,
                sequence,
                deadline,
                window,
                reply,
            } => {
                let result = if retiring {
                    Err(DispatchError::ArbiterUnavailable(self.trip_id))
                } else {
                    self.open(trip_type, sequence, deadline, window)
                };
                let _ = reply.send(result);
            }
            ArbiterCommand::OfferSent {
                driver_id,
                sequence,
                reply,
            } => {
                let recorded = self
                    .cycle
                    .as_mut()
                    .map_or(false, |cycle| cycle.record_offer(driver_id, sequence));
                let _ = reply.send(recorded);
            }
            ArbiterCommand::Accept {
                driver_id,
                sequence,
                reply,
            } => {
                let (result, settled) = self.accept(driver_id, sequence).await;
                self.log_accept(&driver_id, sequence, &result);
                let _ = reply.send(result);
                if let Some(outcome) = settled {
                    if let OfferOutcome::Assigned { driver_id: winner } = outcome {
                        if winner != driver_id {
                            self.confirm_winner(winner).await;
                        }
                    }
                    self.settle(outcome).await;
                }
            }
            ArbiterCommand::Decline {
                driver_id,
                sequence,
                reply,
            } => {
                let outcome = self
                    .cycle
                    .as_mut()
                    .map_or(DeclineOutcome::NoLongerAvailable, |cycle| {
                        cycle.decline(driver_id, sequence)
                    });
                tracing::debug!(
                    trip_id = %self.trip_id,
                    %driver_id,
                    %sequence,
                    ?outcome,
                    "offer declined"
                );
                let _ = reply.send(outcome);
            }
            ArbiterCommand::Timeout { sequence } => {
                let expired = self.cycle.as_mut().and_then(|cycle| cycle.expire(sequence));
                match expired {
                    Some(outcome) => {
                        self.timer = None;
                        tracing::info!(trip_id = %self.trip_id, %sequence, "offer cycle expired");
                        self.settle(outcome).await;
                    }
                    None => {
                        tracing::debug!(
                            trip_id = %self.trip_id,
                            %sequence,
                            "stale timeout ignored"
                        );
                    }
                }
            }
            ArbiterCommand::Cancel { reply } => {
                let cancelled = self.cycle.as_mut().and_then(|cycle| cycle.cancel());
                let _ = reply.send(cancelled);
                if let Some(outcome) = cancelled {
                    tracing::info!(trip_id = %self.trip_id, "offer cycle cancelled");
                    self.settle(outcome).await;
                }
            }
        }
    }

    fn open(
        &mut self,
        trip_type: TripType,
        sequence: DispatchSequence,
        deadline: Timestamp,
        window: std::time::Duration,
    ) -> Result<(), DispatchError> {
        match self.cycle.as_mut() {
            Some(cycle) => cycle.reopen(sequence, deadline)?,
            None => self.cycle = Some(DispatchCycle::open(self.trip_id, sequence, deadline)),
        }
        self.trip_type = Some(trip_type);

        if let Some(previous) = self.timer.take() {
            previous.cancel();
        }
        self.timer = Some(OfferLifecycleTimer::schedule(
            self.trip_id,
            sequence,
            window,
            self.mailbox.clone(),
            ArbiterCommand::Timeout { sequence },
        ));

        tracing::info!(
            trip_id = %self.trip_id,
            %sequence,
            deadline = %deadline.to_rfc3339(),
            window_secs = window.as_secs(),
            "offer cycle opened"
        );
        Ok(())
    }

    /// Returns the reply for the driver and, if the cycle closed, the outcome
    /// whose side effects still have to run.
    async fn accept(
        &mut self,
        driver_id: DriverId,
        sequence: DispatchSequence,
    ) -> (Result<AcceptReceipt, DispatchError>, Option<OfferOutcome>) {
        let Some(cycle) = self.cycle.as_ref() else {
            let answer = self
                .shared
                .settled_outcome(self.trip_id, driver_id, sequence)
                .await;
            return (answer, None);
        };
        // A retry from the winner, e.g. after a write that landed but reported failure.
        if cycle.is_assigned_to(&driver_id, sequence) {
            let receipt = AcceptReceipt {
                trip_id: self.trip_id,
                driver_id,
                sequence,
            };
            return (Ok(receipt), None);
        }
        if let Err(err) = cycle.check_accept(&driver_id, sequence) {
            return (Err(err), None);
        }
        if let Err(err) = self.check_driver(&driver_id).await {
            return (Err(err), None);
        }

        let stored = match self.persist_assignment(&driver_id).await {
            Ok(stored) => stored,
            Err(err) => return (Err(err), None),
        };

        let winner = match stored {
            AssignmentResult::Assigned => driver_id,
            // An earlier attempt landed even though it reported failure.
            AssignmentResult::AlreadyAssignedTo(existing) if existing == driver_id => driver_id,
            AssignmentResult::AlreadyAssignedTo(existing) => {
                tracing::warn!(
                    trip_id = %self.trip_id,
                    %driver_id,
                    existing_driver = %existing,
                    "trip row already carried a driver"
                );
                existing
            }
        };

        let Some(cycle) = self.cycle.as_mut() else {
            return (Err(DispatchError::ArbiterUnavailable(self.trip_id)), None);
        };
        let outcome = match cycle.assign(winner) {
            Ok(outcome) => outcome,
            Err(err) => return (Err(err), None),
        };

        let result = if winner == driver_id {
            Ok(AcceptReceipt {
                trip_id: self.trip_id,
                driver_id,
                sequence,
            })
        } else {
            Err(DispatchError::AlreadyAssigned)
        };
        (result, Some(outcome))
    }

    /// The driver must still be available, approved and capable.
    async fn check_driver(&self, driver_id: &DriverId) -> Result<(), DispatchError> {
        let record = self
            .shared
            .geo
            .get(driver_id)
            .await
            .ok_or_else(|| DispatchError::not_eligible("driver is not registered"))?;

        let eligible = match self.trip_type {
            Some(trip_type) => record.can_take(trip_type),
            None => false,
        };
        if eligible {
            Ok(())
        } else {
            Err(DispatchError::not_eligible("driver is no longer available"))
        }
    }

    /// The single authoritative write, retried with linear backoff.
    async fn persist_assignment(
        &self,
        driver_id: &DriverId,
    ) -> Result<AssignmentResult, DispatchError> {
        let settings = &self.shared.settings;
        let max_attempts = settings.max_persist_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self
                .shared
                .ports
                .trips
                .assign_driver(&self.trip_id, driver_id)
                .await
            {
                Ok(result) => return Ok(result),
                Err(err) if err.code == ErrorCode::TripNotFound => {
                    return Err(DispatchError::TripNotFound(self.trip_id));
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(
                        trip_id = %self.trip_id,
                        %driver_id,
                        attempt,
                        error = %err,
                        "assignment write failed, retrying"
                    );
                    time::sleep(settings.persist_retry_backoff * attempt).await;
                }
                Err(err) => {
                    tracing::error!(
                        trip_id = %self.trip_id,
                        %driver_id,
                        attempts = attempt,
                        error = %err,
                        "assignment write failed, cycle stays open"
                    );
                    return Err(DispatchError::PersistenceFailure {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    /// Tells the driver the trip row names that they hold the trip.
    ///
    /// Their own accept was answered with a failure whose write had in fact
    /// landed, so the win surfaced through someone else's accept.
    async fn confirm_winner(&self, winner: DriverId) {
        let Some(sequence) = self.cycle.as_ref().map(|cycle| cycle.sequence()) else {
            return;
        };
        let message = DriverMessage::Assigned {
            trip_id: self.trip_id,
            sequence,
        };
        if let Err(err) = self.shared.ports.channel.send(winner, message).await {
            tracing::warn!(
                trip_id = %self.trip_id,
                driver_id = %winner,
                error = %err,
                "assignment notice not delivered"
            );
        }
    }

    /// Side effects of a terminal outcome. Failures here are logged only;
    /// the outcome itself is already final.
    async fn settle(&mut self, outcome: OfferOutcome) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        let Some(cycle) = self.cycle.as_ref() else {
            return;
        };
        let sequence = cycle.sequence();
        let invalidation = OfferInvalidation {
            trip_id: self.trip_id,
            sequence,
            reason: outcome.invalidation_reason(),
        };

        let channel = &self.shared.ports.channel;
        let sends = cycle.outstanding_offers().into_iter().map(|driver_id| {
            let message = DriverMessage::OfferInvalidated(invalidation.clone());
            async move {
                if let Err(err) = channel.send(driver_id, message).await {
                    tracing::debug!(%driver_id, error = %err, "invalidation not delivered");
                }
            }
        });
        join_all(sends).await;

        let update = TripStatusUpdate {
            trip_id: self.trip_id,
            sequence,
            outcome,
            occurred_at: Timestamp::now(),
        };
        if let Err(err) = self.shared.ports.notifications.notify(update).await {
            tracing::warn!(trip_id = %self.trip_id, error = %err, "passenger notification failed");
        }

        let envelope = self.outcome_event(outcome, sequence);
        if let Err(err) = self.shared.ports.events.publish(envelope).await {
            tracing::warn!(
                trip_id = %self.trip_id,
                error = %err,
                "failed to publish outcome event"
            );
        }
    }

    fn outcome_event(&self, outcome: OfferOutcome, sequence: DispatchSequence) -> EventEnvelope {
        let now = Timestamp::now();
        let envelope = match outcome {
            OfferOutcome::Assigned { driver_id } => TripAssigned {
                event_id: EventId::new(),
                trip_id: self.trip_id,
                driver_id,
                sequence,
                assigned_at: now,
            }
            .to_envelope(),
            OfferOutcome::Expired => OfferCycleExpired {
                event_id: EventId::new(),
                trip_id: self.trip_id,
                sequence,
                expired_at: now,
            }
            .to_envelope(),
            OfferOutcome::Cancelled => OfferCycleCancelled {
                event_id: EventId::new(),
                trip_id: self.trip_id,
                sequence,
                cancelled_at: now,
            }
            .to_envelope(),
        };
        envelope.with_correlation_id(format!("{}:{}", self.trip_id, sequence))
    }

    fn log_accept(
        &self,
        driver_id: &DriverId,
        sequence: DispatchSequence,
        result: &Result<AcceptReceipt, DispatchError>,
    ) {
        match result {
            Ok(_) => {
                tracing::info!(trip_id = %self.trip_id, %driver_id, %sequence, "trip assigned")
            }
            Err(DispatchError::PersistenceFailure { .. }) => {}
            Err(err) if err.is_offer_gone() => {
                tracing::debug!(
                    trip_id = %self.trip_id,
                    %driver_id,
                    %sequence,
                    error = %err,
                    "accept lost"
                )
            }
            Err(DispatchError::NotEligible { reason }) => {
                tracing::debug!(
                    trip_id = %self.trip_id,
                    %driver_id,
                    %sequence,
                    %reason,
                    "accept rejected"
                )
            }
            Err(err) => {
                tracing::warn!(
                    trip_id = %self.trip_id,
                    %driver_id,
                    %sequence,
                    error = %err,
                    "accept failed"
                )
            }
        }
    }
}

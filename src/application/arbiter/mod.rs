//! AcceptanceArbiter - the single authority on who gets a trip.
//!
//! Every trip with an open (or recently closed) offer cycle has exactly one
//! actor task that owns its state and reads a bounded mailbox. The router
//! here maps trip ids to mailboxes, so trips never contend with each other
//! while events for one trip are totally ordered.
//!
//! # Lifecycle
//!
//! ```text
//! open_cycle ──► actor spawned ──► OPEN ──► ASSIGNED | EXPIRED | CANCELLED
//!                                   ▲                  │
//!                                   └── re-dispatch ───┤ (EXPIRED/CANCELLED)
//!                                                      ▼
//!                                  linger for closed_cycle_retention, retire
//! ```
//!
//! Once an actor has retired, late accepts are answered from the trip row.

mod actor;
mod command;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::domain::dispatch::{DeclineOutcome, DispatchError, DispatchSequence, OfferOutcome};
use crate::domain::foundation::{DriverId, Timestamp, TripId};
use crate::domain::trip::{TripStatus, TripType};
use crate::ports::{DriverChannel, EventPublisher, NotificationSink, TripRepository};

use super::geo_index::GeoIndex;

use actor::TripActor;
pub use command::AcceptReceipt;
use command::ArbiterCommand;

/// Attempts to reach a live actor when opening a cycle races a retirement.
const OPEN_ATTEMPTS: usize = 3;

/// Tunables for the arbiter actors.
#[derive(Debug, Clone)]
pub struct ArbiterSettings {
    pub mailbox_capacity: usize,
    pub max_persist_attempts: u32,
    pub persist_retry_backoff: Duration,
    pub closed_cycle_retention: Duration,
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
            max_persist_attempts: 3,
            persist_retry_backoff: Duration::from_millis(50),
            closed_cycle_retention: Duration::from_secs(30),
        }
    }
}

/// Outbound ports the arbiter drives.
#[derive(Clone)]
pub struct ArbiterPorts {
    pub trips: Arc<dyn TripRepository>,
    pub channel: Arc<dyn DriverChannel>,
    pub notifications: Arc<dyn NotificationSink>,
    pub events: Arc<dyn EventPublisher>,
}

pub(crate) struct Shared {
    ports: ArbiterPorts,
    geo: Arc<GeoIndex>,
    settings: ArbiterSettings,
    mailboxes: Mutex<HashMap<TripId, mpsc::Sender<ArbiterCommand>>>,
}

impl Shared {
    /// Answer for an accept that arrives when no actor holds the trip.
    async fn settled_outcome(
        &self,
        trip_id: TripId,
        driver_id: DriverId,
        sequence: DispatchSequence,
    ) -> Result<AcceptReceipt, DispatchError> {
        let trip = self
            .ports
            .trips
            .find_by_id(&trip_id)
            .await?
            .ok_or(DispatchError::TripNotFound(trip_id))?;

        if trip.driver_id == Some(driver_id) {
            Ok(AcceptReceipt {
                trip_id,
                driver_id,
                sequence,
            })
        } else if trip.driver_id.is_some() {
            Err(DispatchError::AlreadyAssigned)
        } else if trip.status == TripStatus::Cancelled {
            Err(DispatchError::Cancelled)
        } else {
            Err(DispatchError::Expired)
        }
    }
}

enum Routed<R> {
    Answered(R),
    NoActor,
    Lost,
}

/// Router from trip id to that trip's actor.
///
/// Cheap to clone; clones share the same actors.
#[derive(Clone)]
pub struct AcceptanceArbiter {
    shared: Arc<Shared>,
}

impl AcceptanceArbiter {
    pub fn new(ports: ArbiterPorts, geo: Arc<GeoIndex>, settings: ArbiterSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                ports,
                geo,
                settings,
                mailboxes: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settings(&self) -> &ArbiterSettings {
        &self.shared.settings
    }

    /// Starts a new offer cycle and its deadline timer.
    ///
    /// # Errors
    ///
    /// - `CycleInProgress` while the previous cycle is still open
    /// - `AlreadyAssigned` once the trip has a driver
    pub async fn open_cycle(
        &self,
        trip_id: TripId,
        trip_type: TripType,
        sequence: DispatchSequence,
        deadline: Timestamp,
        window: Duration,
    ) -> Result<(), DispatchError> {
        for _ in 0..OPEN_ATTEMPTS {
            let mailbox = self.mailbox_or_spawn(trip_id).await;
            let (reply, answer) = oneshot::channel();
            let command = ArbiterCommand::OpenCycle {
                trip_type,
                sequence,
                deadline,
                window,
                reply,
            };
            if mailbox.send(command).await.is_err() {
                self.forget(trip_id, &mailbox).await;
                continue;
            }
            match answer.await {
                Ok(Err(DispatchError::ArbiterUnavailable(_))) | Err(_) => {
                    self.forget(trip_id, &mailbox).await;
                }
                Ok(result) => return result,
            }
        }
        Err(DispatchError::ArbiterUnavailable(trip_id))
    }

    /// Registers an offer before it is published.
    ///
    /// Returns false when the cycle already closed; the offer must not go out.
    pub async fn offer_sent(
        &self,
        trip_id: TripId,
        driver_id: DriverId,
        sequence: DispatchSequence,
    ) -> bool {
        let routed = self
            .ask(trip_id, |reply| ArbiterCommand::OfferSent {
                driver_id,
                sequence,
                reply,
            })
            .await;
        matches!(routed, Routed::Answered(true))
    }

    /// A driver's accept. The first valid one wins.
    pub async fn accept(
        &self,
        trip_id: TripId,
        driver_id: DriverId,
        sequence: DispatchSequence,
    ) -> Result<AcceptReceipt, DispatchError> {
        let routed = self
            .ask(trip_id, |reply| ArbiterCommand::Accept {
                driver_id,
                sequence,
                reply,
            })
            .await;
        match routed {
            Routed::Answered(result) => result,
            Routed::NoActor => {
                self.shared
                    .settled_outcome(trip_id, driver_id, sequence)
                    .await
            }
            Routed::Lost => Err(DispatchError::ArbiterUnavailable(trip_id)),
        }
    }

    /// A driver's decline. Never an error for the driver.
    pub async fn decline(
        &self,
        trip_id: TripId,
        driver_id: DriverId,
        sequence: DispatchSequence,
    ) -> Result<DeclineOutcome, DispatchError> {
        let routed = self
            .ask(trip_id, |reply| ArbiterCommand::Decline {
                driver_id,
                sequence,
                reply,
            })
            .await;
        match routed {
            Routed::Answered(outcome) => Ok(outcome),
            Routed::NoActor => Ok(DeclineOutcome::NoLongerAvailable),
            Routed::Lost => Err(DispatchError::ArbiterUnavailable(trip_id)),
        }
    }

    /// Withdraws the trip. Returns the outcome if an open cycle was closed.
    pub async fn cancel(&self, trip_id: TripId) -> Result<Option<OfferOutcome>, DispatchError> {
        match self
            .ask(trip_id, |reply| ArbiterCommand::Cancel { reply })
            .await
        {
            Routed::Answered(outcome) => Ok(outcome),
            Routed::NoActor => Ok(None),
            Routed::Lost => Err(DispatchError::ArbiterUnavailable(trip_id)),
        }
    }

    /// Whether an actor currently holds this trip.
    pub async fn is_tracking(&self, trip_id: &TripId) -> bool {
        self.shared.mailboxes.lock().await.contains_key(trip_id)
    }

    pub async fn tracked_trips(&self) -> usize {
        self.shared.mailboxes.lock().await.len()
    }

    async fn ask<R>(
        &self,
        trip_id: TripId,
        make: impl FnOnce(oneshot::Sender<R>) -> ArbiterCommand,
    ) -> Routed<R> {
        let Some(mailbox) = self.mailbox(trip_id).await else {
            return Routed::NoActor;
        };
        let (reply, answer) = oneshot::channel();
        if mailbox.send(make(reply)).await.is_err() {
            self.forget(trip_id, &mailbox).await;
            return Routed::NoActor;
        }
        match answer.await {
            Ok(value) => Routed::Answered(value),
            Err(_) => {
                tracing::error!(%trip_id, "arbiter dropped a request");
                Routed::Lost
            }
        }
    }

    async fn mailbox(&self, trip_id: TripId) -> Option<mpsc::Sender<ArbiterCommand>> {
        self.shared
            .mailboxes
            .lock()
            .await
            .get(&trip_id)
            .filter(|tx| !tx.is_closed())
            .cloned()
    }

    async fn mailbox_or_spawn(&self, trip_id: TripId) -> mpsc::Sender<ArbiterCommand> {
        let mut mailboxes = self.shared.mailboxes.lock().await;
        if let Some(existing) = mailboxes.get(&trip_id).filter(|tx| !tx.is_closed()) {
            return existing.clone();
        }

        let (tx, rx) = mpsc::channel(self.shared.settings.mailbox_capacity.max(1));
        let actor = TripActor::new(trip_id, tx.clone(), Arc::clone(&self.shared));
        tokio::spawn(actor.run(rx));
        mailboxes.insert(trip_id, tx.clone());
        tx
    }

    async fn forget(&self, trip_id: TripId, stale: &mpsc::Sender<ArbiterCommand>) {
        let mut mailboxes = self.shared.mailboxes.lock().await;
        if mailboxes
            .get(&trip_id)
            .map_or(false, |tx| tx.same_channel(stale))
        {
            mailboxes.remove(&trip_id);
        }
    }
}

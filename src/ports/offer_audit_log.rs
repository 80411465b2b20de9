//! Append-only record of which drivers were shown which offer.

use async_trait::async_trait;

use crate::domain::dispatch::OfferShown;
use crate::domain::foundation::DomainError;

/// Audit sink for offers shown to drivers.
///
/// Writes are fire-and-forget from the broadcaster's point of view and are
/// never read back by the arbiter. Recording the same (trip, driver,
/// sequence) twice must not fail.
#[async_trait]
pub trait OfferAuditLog: Send + Sync {
    async fn record_shown(&self, entry: OfferShown) -> Result<(), DomainError>;
}

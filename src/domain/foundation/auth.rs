//! Authentication types for the domain layer.
//!
//! These types represent an authenticated caller extracted from a validated
//! session token. Driver identity for offer responses is always taken from
//! here, never from a field the client supplies.

use super::{DriverId, TenantId, UserId};
use thiserror::Error;

/// Authenticated caller extracted from a validated token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the auth provider.
    pub id: UserId,

    /// Display name if available.
    pub display_name: Option<String>,

    /// Tenant the session is scoped to, if the token carries one.
    pub tenant_id: Option<TenantId>,

    /// Driver profile vouched for by the identity provider, if any.
    pub driver_id: Option<DriverId>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, display_name: Option<String>, tenant_id: Option<TenantId>) -> Self {
        Self {
            id,
            display_name,
            tenant_id,
            driver_id: None,
        }
    }

    /// Attaches the driver profile claim.
    pub fn with_driver_id(mut self, driver_id: DriverId) -> Self {
        self.driver_id = Some(driver_id);
        self
    }

    /// Unscoped sessions see every tenant; scoped ones only their own.
    pub fn may_access_tenant(&self, tenant: &TenantId) -> bool {
        self.tenant_id.as_ref().map_or(true, |own| own == tenant)
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the account has no driver profile.
    #[error("No driver profile for user")]
    NotADriver,

    /// The authentication service is unavailable.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the caller should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}

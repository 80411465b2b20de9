//! Mock session validator for tests and local development.
//!
//! # Example
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_driver("driver-token", "driver-user", driver_id)
//!     .with_test_user("passenger-token", "passenger-user");
//!
//! let user = validator.validate("driver-token").await?;
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, DriverId, UserId};
use crate::ports::SessionValidator;

/// Maps fixed tokens to users. Unknown tokens return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set.
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> RwLockReadGuard<'_, HashMap<String, AuthenticatedUser>> {
        self.tokens.read().unwrap_or_else(|p| p.into_inner())
    }

    fn tokens_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, AuthenticatedUser>> {
        self.tokens.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a token for a plain (non-driver) user.
    ///
    /// An invalid `user_id` leaves the validator unchanged.
    pub fn with_test_user(self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        match UserId::new(user_id) {
            Ok(id) => self.with_user(token, AuthenticatedUser::new(id, None, None)),
            Err(_) => self,
        }
    }

    /// Adds a token whose user carries a driver claim.
    pub fn with_driver(
        self,
        token: impl Into<String>,
        user_id: impl Into<String>,
        driver_id: DriverId,
    ) -> Self {
        match UserId::new(user_id) {
            Ok(id) => self.with_user(
                token,
                AuthenticatedUser::new(id, None, None).with_driver_id(driver_id),
            ),
            Err(_) => self,
        }
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(|p| p.into_inner()) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *self.force_error.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens_mut().insert(token.into(), user);
    }

    pub fn remove_token(&self, token: &str) {
        self.tokens_mut().remove(token);
    }

    pub fn token_count(&self) -> usize {
        self.tokens().len()
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
        {
            return Err(error);
        }

        self.tokens()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_returns_user() {
        let validator = MockSessionValidator::new().with_test_user("t-1", "passenger-1");

        let user = validator.validate("t-1").await.unwrap();

        assert_eq!(user.id.as_str(), "passenger-1");
        assert!(user.driver_id.is_none());
    }

    #[tokio::test]
    async fn driver_token_carries_claim() {
        let driver = DriverId::new();
        let validator = MockSessionValidator::new().with_driver("t-d", "driver-1", driver);

        let user = validator.validate("t-d").await.unwrap();

        assert_eq!(user.driver_id, Some(driver));
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let validator = MockSessionValidator::new();

        assert_eq!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn forced_error_wins_until_cleared() {
        let validator = MockSessionValidator::new()
            .with_test_user("t-1", "u-1")
            .with_error(AuthError::service_unavailable("idp down"));

        assert!(matches!(
            validator.validate("t-1").await,
            Err(AuthError::ServiceUnavailable(_))
        ));

        validator.clear_error();
        assert!(validator.validate("t-1").await.is_ok());
    }

    #[tokio::test]
    async fn removed_token_stops_working() {
        let validator = MockSessionValidator::new().with_test_user("t-1", "u-1");
        validator.remove_token("t-1");

        assert_eq!(validator.token_count(), 0);
        assert!(validator.validate("t-1").await.is_err());
    }
}

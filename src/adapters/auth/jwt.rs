//! HS256 JWT session validator.
//!
//! Validates access tokens signed with a shared secret:
//!
//! 1. Verify the HS256 signature
//! 2. Validate issuer, audience and expiry
//! 3. Map claims to `AuthenticatedUser`, including the optional
//!    `driver_id` claim vouched for by the identity provider
//!
//! # Example
//!
//! ```ignore
//! let validator = JwtSessionValidator::new(JwtConfig::new(secret, "ride-auth", "ride-dispatch"));
//! let user = validator.validate("eyJ...").await?;
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, DriverId, TenantId, UserId};
use crate::ports::SessionValidator;

/// Settings for [`JwtSessionValidator`].
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

impl JwtConfig {
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_secs: 30,
        }
    }
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
}

pub struct JwtSessionValidator {
    config: JwtConfig,
    decoding_key: DecodingKey,
}

impl JwtSessionValidator {
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());
        Self {
            config,
            decoding_key,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.leeway = self.config.leeway_secs;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }

    fn decode_claims(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!("token issued for another service: {}", e);
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!("token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            })
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.decode_claims(token)?;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("invalid subject in token");
            AuthError::InvalidToken
        })?;
        let tenant_id = claims
            .tenant
            .map(TenantId::new)
            .transpose()
            .map_err(|_| AuthError::InvalidToken)?;

        let mut user = AuthenticatedUser::new(user_id, claims.name, tenant_id);
        if let Some(raw) = claims.driver_id {
            let driver_id: DriverId = raw.parse().map_err(|_| {
                tracing::warn!("malformed driver_id claim");
                AuthError::InvalidToken
            })?;
            user = user.with_driver_id(driver_id);
        }
        Ok(user)
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

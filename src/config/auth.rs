//! Session token configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::auth::JwtConfig;

/// Minimum HS256 secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// HS256 session token settings.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared signing secret
    pub jwt_secret: String,

    /// Expected `iss` claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Expected `aud` claim
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Clock skew tolerated on `exp`
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Production requires a secret of at least [`MIN_PRODUCTION_SECRET_LEN`]
    /// bytes; development only requires one to be present.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("auth.jwt_secret"));
        }
        if self.issuer.is_empty() {
            return Err(ValidationError::MissingRequired("auth.issuer"));
        }
        if self.audience.is_empty() {
            return Err(ValidationError::MissingRequired("auth.audience"));
        }
        if *environment == Environment::Production
            && self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN
        {
            return Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_LEN));
        }
        Ok(())
    }

    pub fn to_jwt_config(&self) -> JwtConfig {
        let mut config = JwtConfig::new(self.jwt_secret.clone(), &self.issuer, &self.audience);
        config.leeway_secs = self.leeway_secs;
        config
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: default_issuer(),
            audience: default_audience(),
            leeway_secs: default_leeway(),
        }
    }
}

fn default_issuer() -> String {
    "ride-auth".to_string()
}

fn default_audience() -> String {
    "ride-dispatch".to_string()
}

fn default_leeway() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_secret_fails() {
        assert!(matches!(
            AuthConfig::default().validate(&Environment::Development),
            Err(ValidationError::MissingRequired("auth.jwt_secret"))
        ));
    }

    #[test]
    fn test_short_secret_allowed_in_development() {
        assert!(config("dev-secret").validate(&Environment::Development).is_ok());
    }

    #[test]
    fn test_short_secret_rejected_in_production() {
        assert!(matches!(
            config("dev-secret").validate(&Environment::Production),
            Err(ValidationError::JwtSecretTooShort(_))
        ));
        assert!(config(&"x".repeat(MIN_PRODUCTION_SECRET_LEN))
            .validate(&Environment::Production)
            .is_ok());
    }

    #[test]
    fn test_to_jwt_config_carries_claims_and_leeway() {
        let mut auth = config("dev-secret");
        auth.leeway_secs = 5;

        let jwt = auth.to_jwt_config();

        assert_eq!(jwt.secret.expose_secret(), "dev-secret");
        assert_eq!(jwt.issuer, "ride-auth");
        assert_eq!(jwt.audience, "ride-dispatch");
        assert_eq!(jwt.leeway_secs, 5);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
    }
}

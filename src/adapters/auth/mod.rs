//! Authentication adapters implementing the `SessionValidator` port:
//!
//! - `jwt` - HS256 JWT validation for production
//! - `mock` - Fixed token table for tests and local development

mod jwt;
mod mock;

pub use jwt::{JwtConfig, JwtSessionValidator, SessionClaims};
pub use mock::MockSessionValidator;

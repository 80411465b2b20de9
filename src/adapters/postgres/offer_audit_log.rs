//! PostgreSQL implementation of OfferAuditLog.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::dispatch::OfferShown;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::OfferAuditLog;

/// Writes `offers_shown` rows. Primary key (trip_id, sequence, driver_id)
/// makes a repeated write a no-op.
#[derive(Clone)]
pub struct PostgresOfferAuditLog {
    pool: PgPool,
}

impl PostgresOfferAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OfferAuditLog for PostgresOfferAuditLog {
    async fn record_shown(&self, entry: OfferShown) -> Result<(), DomainError> {
        let sequence = i64::try_from(entry.sequence.value()).map_err(|_| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Sequence {} out of range", entry.sequence),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO offers_shown (
                trip_id, sequence, driver_id, distance_km, estimated_earnings, shown_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (trip_id, sequence, driver_id) DO NOTHING
            "#,
        )
        .bind(entry.trip_id.as_uuid())
        .bind(sequence)
        .bind(entry.driver_id.as_uuid())
        .bind(entry.distance_km)
        .bind(entry.estimated_earnings)
        .bind(entry.shown_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record offer shown: {}", e),
            )
        })?;

        Ok(())
    }
}

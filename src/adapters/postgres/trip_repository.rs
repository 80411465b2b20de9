//! PostgreSQL implementation of TripRepository.
//!
//! The `trips` table belongs to the booking subsystem; dispatch reads rows
//! and performs a single conditional write on `driver_id`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{
    DomainError, DriverId, ErrorCode, GeoPoint, TenantId, Timestamp, TripId,
};
use crate::domain::trip::{Place, Trip, TripStatus, TripType};
use crate::ports::{AssignmentResult, TripRepository};

#[derive(Clone)]
pub struct PostgresTripRepository {
    pool: PgPool,
}

impl PostgresTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripRepository for PostgresTripRepository {
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id,
                   origin_name, origin_lat, origin_lng,
                   destination_name, destination_lat, destination_lng,
                   departure_time, seats_total, seats_available,
                   base_price, platform_fee, trip_type, discovery_radius_km,
                   status, driver_id
            FROM trips
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch trip", e))?;

        row.map(row_to_trip).transpose()
    }

    async fn assign_driver(
        &self,
        trip_id: &TripId,
        driver_id: &DriverId,
    ) -> Result<AssignmentResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE trips SET
                driver_id = $2,
                status = 'ASSIGNED',
                updated_at = NOW()
            WHERE id = $1 AND driver_id IS NULL
            "#,
        )
        .bind(trip_id.as_uuid())
        .bind(driver_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to assign driver", e))?;

        if result.rows_affected() == 1 {
            return Ok(AssignmentResult::Assigned);
        }

        // Zero rows: either someone else holds the trip or it does not exist.
        let existing: Option<(Option<uuid::Uuid>,)> =
            sqlx::query_as("SELECT driver_id FROM trips WHERE id = $1")
                .bind(trip_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to read assigned driver", e))?;

        match existing {
            Some((Some(holder),)) => Ok(AssignmentResult::AlreadyAssignedTo(
                DriverId::from_uuid(holder),
            )),
            Some((None,)) => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Assignment for trip {} matched no row", trip_id),
            )),
            None => Err(DomainError::new(
                ErrorCode::TripNotFound,
                format!("Trip not found: {}", trip_id),
            )),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn column<'r, T>(row: &'r sqlx::postgres::PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get {}: {}", name, e),
        )
    })
}

fn place(name: String, lat: f64, lng: f64) -> Result<Place, DomainError> {
    let point = GeoPoint::new(lat, lng)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
    Ok(Place::new(name, point))
}

fn row_to_trip(row: sqlx::postgres::PgRow) -> Result<Trip, DomainError> {
    let id: uuid::Uuid = column(&row, "id")?;
    let tenant: String = column(&row, "tenant_id")?;
    let trip_type: String = column(&row, "trip_type")?;
    let status: String = column(&row, "status")?;
    let departure: chrono::DateTime<chrono::Utc> = column(&row, "departure_time")?;
    let seats_total: i32 = column(&row, "seats_total")?;
    let seats_available: i32 = column(&row, "seats_available")?;
    let driver_id: Option<uuid::Uuid> = column(&row, "driver_id")?;

    let invalid = |e: crate::domain::foundation::ValidationError| {
        DomainError::new(ErrorCode::DatabaseError, e.to_string())
    };

    Ok(Trip {
        id: TripId::from_uuid(id),
        tenant_id: TenantId::new(tenant).map_err(invalid)?,
        origin: place(
            column(&row, "origin_name")?,
            column(&row, "origin_lat")?,
            column(&row, "origin_lng")?,
        )?,
        destination: place(
            column(&row, "destination_name")?,
            column(&row, "destination_lat")?,
            column(&row, "destination_lng")?,
        )?,
        departure_time: Timestamp::from_datetime(departure),
        seats_total: u32::try_from(seats_total).unwrap_or(0),
        seats_available: u32::try_from(seats_available).unwrap_or(0),
        base_price: column(&row, "base_price")?,
        platform_fee: column(&row, "platform_fee")?,
        trip_type: trip_type.parse::<TripType>().map_err(invalid)?,
        discovery_radius_km: column(&row, "discovery_radius_km")?,
        status: status.parse::<TripStatus>().map_err(invalid)?,
        driver_id: driver_id.map(DriverId::from_uuid),
    })
}

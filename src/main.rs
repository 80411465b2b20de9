//! ride-dispatch server binary.
//!
//! Loads configuration from the environment, wires adapters into the
//! dispatch engine and serves HTTP + WebSocket until Ctrl+C / SIGTERM.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ride_dispatch::adapters::auth::JwtSessionValidator;
use ride_dispatch::adapters::events::InMemoryEventBus;
use ride_dispatch::adapters::http::{app_router, AppState};
use ride_dispatch::adapters::memory::{InMemoryOfferAuditLog, InMemoryTripRepository};
use ride_dispatch::adapters::postgres::{PostgresOfferAuditLog, PostgresTripRepository};
use ride_dispatch::adapters::websocket::{
    DriverConnections, FanoutNotificationSink, LoggingNotificationSink, PassengerRooms,
};
use ride_dispatch::application::{
    AcceptanceArbiter, ArbiterPorts, DispatchService, GeoIndex, OfferBroadcaster,
    SequenceAllocator, SubscriptionRegistry,
};
use ride_dispatch::config::{AppConfig, DatabaseConfig, ServerConfig};
use ride_dispatch::ports::{NotificationSink, OfferAuditLog, TripRepository};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let (trips, audit) = storage(config.database.as_ref()).await?;

    let geo = Arc::new(GeoIndex::new(config.dispatch.location_staleness()));
    let subscriptions = Arc::new(SubscriptionRegistry::new());
    let connections = Arc::new(DriverConnections::new(
        config.dispatch.driver_channel_capacity,
    ));
    let rooms = Arc::new(PassengerRooms::with_default_capacity());
    let notifications: Arc<dyn NotificationSink> = Arc::new(FanoutNotificationSink::new(vec![
        rooms.clone() as Arc<dyn NotificationSink>,
        Arc::new(LoggingNotificationSink),
    ]));
    let events = Arc::new(InMemoryEventBus::new());

    let arbiter = AcceptanceArbiter::new(
        ArbiterPorts {
            trips: trips.clone(),
            channel: connections.clone(),
            notifications,
            events: events.clone(),
        },
        geo.clone(),
        config.dispatch.arbiter_settings(),
    );
    let broadcaster = OfferBroadcaster::new(
        config.dispatch.offer_policy()?,
        geo.clone(),
        subscriptions.clone(),
        Arc::new(SequenceAllocator::seeded_from_clock()),
        arbiter.clone(),
        connections.clone(),
        audit,
        events,
    );
    let service = Arc::new(DispatchService::new(
        trips,
        geo,
        subscriptions,
        broadcaster,
        arbiter,
    ));

    let state = AppState {
        service,
        validator: Arc::new(JwtSessionValidator::new(config.auth.to_jwt_config())),
        connections,
        rooms,
    };
    let app = app_router(state, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "ride-dispatch listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("ride-dispatch stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

async fn storage(
    database: Option<&DatabaseConfig>,
) -> Result<(Arc<dyn TripRepository>, Arc<dyn OfferAuditLog>), BoxError> {
    let Some(database) = database else {
        tracing::warn!("no database configured; using in-memory trip storage");
        return Ok((
            Arc::new(InMemoryTripRepository::new()),
            Arc::new(InMemoryOfferAuditLog::new()),
        ));
    };

    let pool = database.pool_options().connect(&database.url).await?;
    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }
    Ok((
        Arc::new(PostgresTripRepository::new(pool.clone())),
        Arc::new(PostgresOfferAuditLog::new(pool)),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

//! Parking Reservations Maintenance Daemon
//!
//! Connects to PostgreSQL, applies migrations when asked to, and runs the
//! reservation cleanup pass on a fixed interval until interrupted.

use anyhow::Context;
use parking_core::{AppConfig, SystemClock};
use parking_db::{create_pool, run_migrations, PgParkingStore};
use parking_services::{CleanupWorker, ConfiguredRateLookup, ReservationEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing(config: &AppConfig) {
    let log_level = &config.logging.level;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "parking_reservations={},parking_services={},parking_db={},sqlx=warn",
            log_level, log_level, log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.logging.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!(
        "Starting Parking Reservations daemon v{}",
        env!("CARGO_PKG_VERSION")
    );

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to apply migrations")?;
    }

    let store = Arc::new(PgParkingStore::new(pool, config.database.isolation_level));
    let rates = Arc::new(
        ConfiguredRateLookup::from_config(&config.reservations)
            .context("Invalid reservation rate configuration")?,
    );
    let engine = Arc::new(ReservationEngine::new(
        store,
        rates,
        Arc::new(SystemClock),
        config.reservations.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = if config.cleanup.enabled {
        let period = Duration::from_secs(config.cleanup.interval_secs.max(1));
        Some(CleanupWorker::new(engine, period).spawn(shutdown_rx))
    } else {
        warn!("Reservation cleanup is disabled; lapsed reservations keep their spots reserved");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    // Receivers may already be gone when the worker is disabled
    let _ = shutdown_tx.send(true);

    if let Some(handle) = worker {
        handle.await.context("Cleanup worker panicked")?;
    }

    info!("Parking Reservations daemon stopped");

    Ok(())
}

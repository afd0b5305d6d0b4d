//! Periodic expiry of lapsed reservations
//!
//! Runs [`ReservationEngine::cleanup_expired_reservations`] on a fixed
//! interval until shutdown is signalled. A failing pass is logged and the
//! next tick tries again.

use parking_core::traits::{RateLookup, TransactionCoordinator};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::reservation_engine::ReservationEngine;

/// Background driver for the cleanup pass
pub struct CleanupWorker<C: TransactionCoordinator, R: RateLookup> {
    engine: Arc<ReservationEngine<C, R>>,
    period: Duration,
}

impl<C, R> CleanupWorker<C, R>
where
    C: TransactionCoordinator + 'static,
    R: RateLookup + 'static,
{
    pub fn new(engine: Arc<ReservationEngine<C, R>>, period: Duration) -> Self {
        Self { engine, period }
    }

    /// Run one cleanup pass, logging rather than returning failures
    ///
    /// Returns the number of reservations expired.
    pub async fn run_once(&self) -> u64 {
        match self.engine.cleanup_expired_reservations().await {
            Ok(0) => {
                debug!("Cleanup pass found nothing to expire");
                0
            }
            Ok(expired) => {
                info!("Cleanup pass expired {} reservations", expired);
                expired
            }
            Err(e) => {
                error!("Cleanup pass failed: {}", e);
                0
            }
        }
    }

    /// Tick until `shutdown` becomes true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Cleanup worker started (every {:?})", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cleanup worker stopped");
    }

    /// Spawn the worker onto the runtime
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()>
    where
        C::Tx: 'static,
    {
        tokio::spawn(self.run(shutdown))
    }
}

//! Parking Reservations Database Layer
//!
//! This crate provides the store implementations the reservation engine runs
//! its transactions through:
//!
//! - Connection pool management and embedded migrations with sqlx
//! - `PgParkingStore`: PostgreSQL transactions at a configurable isolation level
//! - `MemoryParkingStore`: a serialized in-memory store for development and tests

pub mod memory;
pub mod pool;
pub mod repositories;
pub mod store;

pub use memory::{MemoryParkingStore, MemoryParkingTx};
pub use pool::{create_pool, run_migrations};
pub use store::{PgParkingStore, PgParkingTx};

// Re-export commonly used types
pub use parking_core::{AppError, AppResult};
pub use sqlx::PgPool;

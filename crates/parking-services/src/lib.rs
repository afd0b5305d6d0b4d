//! Business logic services for parking reservations
//!
//! # Architecture
//!
//! Services own their collaborators behind `Arc` handles and never reach for
//! a global: the transaction coordinator, the rate lookup and the clock are
//! all passed in at construction. Every mutating operation runs inside one
//! store transaction.
//!
//! # Services
//!
//! - `ReservationEngine` - Reservation lifecycle, queries and statistics
//! - `ConfiguredRateLookup` - Hourly rate for a spot from configuration
//! - `CleanupWorker` - Periodic expiry of lapsed reservations

pub mod cleanup;
pub mod rating;
pub mod reservation_engine;

pub use cleanup::CleanupWorker;
pub use rating::ConfiguredRateLookup;
pub use reservation_engine::ReservationEngine;

/// Business logic constants
pub mod constants {
    /// Decimal places kept for configured hourly rates
    pub const RATE_DECIMAL_PLACES: u32 = 2;
}

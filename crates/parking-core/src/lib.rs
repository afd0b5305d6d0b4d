//! Parking Reservations Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the parking reservation engine. It includes:
//!
//! - Domain models (Spot, Vehicle, Session, ReservationView, ReservationStats)
//! - Store traits the engine runs its transactions through
//! - Unified error handling
//! - Application configuration and the injectable clock

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

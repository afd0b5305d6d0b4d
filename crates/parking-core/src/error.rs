//! Unified error handling for parking reservations
//!
//! Every failure the engine or the stores can produce is an [`AppError`].
//! Domain variants are request-level failures surfaced to the caller as-is;
//! infrastructure variants carry the underlying store message.

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A concurrent transaction won a write race; the current transaction
    /// is aborted and must not issue further statements
    #[error("Conflict: {0}")]
    Conflict(String),

    // ==================== Reservation Errors ====================
    #[error("Spot unavailable: {0}")]
    SpotUnavailable(String),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("Vehicle already parked: {0}")]
    VehicleAlreadyParked(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Reservation expired: {0}")]
    ReservationExpired(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Migration(_) => "migration_error",
            AppError::Conflict(_) => "conflict",
            AppError::SpotUnavailable(_) => "spot_unavailable",
            AppError::VehicleNotFound(_) => "vehicle_not_found",
            AppError::VehicleAlreadyParked(_) => "vehicle_already_parked",
            AppError::ReservationNotFound(_) => "reservation_not_found",
            AppError::ReservationExpired(_) => "reservation_expired",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
        }
    }

    /// True for request-level failures raised by reservation preconditions
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            AppError::SpotUnavailable(_)
                | AppError::VehicleNotFound(_)
                | AppError::VehicleAlreadyParked(_)
                | AppError::ReservationNotFound(_)
                | AppError::ReservationExpired(_)
                | AppError::Validation(_)
                | AppError::InvalidInput(_)
        )
    }
}

// ==================== From implementations ====================

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::SpotUnavailable("A-01".to_string()).error_code(),
            "spot_unavailable"
        );
        assert_eq!(
            AppError::ReservationExpired("x".to_string()).error_code(),
            "reservation_expired"
        );
        assert_eq!(AppError::Conflict("x".to_string()).error_code(), "conflict");
    }

    #[test]
    fn test_domain_errors() {
        assert!(AppError::VehicleAlreadyParked("ABC-123".to_string()).is_domain_error());
        assert!(AppError::ReservationNotFound("x".to_string()).is_domain_error());
        assert!(!AppError::Database("connection reset".to_string()).is_domain_error());
        assert!(!AppError::Transaction("commit failed".to_string()).is_domain_error());
        assert!(!AppError::Conflict("spot 4".to_string()).is_domain_error());
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::VehicleNotFound("42".to_string());
        assert_eq!(err.to_string(), "Vehicle not found: 42");
    }
}

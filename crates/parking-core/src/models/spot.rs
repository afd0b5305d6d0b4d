//! Parking spot model
//!
//! Spots are owned by spot management; the reservation engine only reads them
//! and flips their status inside its own transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spot availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpotStatus {
    /// Free to be reserved or occupied
    #[default]
    Available,
    /// Held by an active reservation
    Reserved,
    /// A vehicle is parked
    Occupied,
    /// Broken, not usable
    OutOfOrder,
    /// Temporarily closed for maintenance
    Maintenance,
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotStatus::Available => write!(f, "AVAILABLE"),
            SpotStatus::Reserved => write!(f, "RESERVED"),
            SpotStatus::Occupied => write!(f, "OCCUPIED"),
            SpotStatus::OutOfOrder => write!(f, "OUT_OF_ORDER"),
            SpotStatus::Maintenance => write!(f, "MAINTENANCE"),
        }
    }
}

impl SpotStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Some(SpotStatus::Available),
            "RESERVED" => Some(SpotStatus::Reserved),
            "OCCUPIED" => Some(SpotStatus::Occupied),
            "OUT_OF_ORDER" => Some(SpotStatus::OutOfOrder),
            "MAINTENANCE" => Some(SpotStatus::Maintenance),
            _ => None,
        }
    }

    /// Spots in these states are never handed out by the engine
    pub fn is_out_of_service(&self) -> bool {
        matches!(self, SpotStatus::OutOfOrder | SpotStatus::Maintenance)
    }
}

/// Parking spot entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    /// Unique identifier
    pub id: i32,

    /// Human-readable number painted on the spot (e.g. "B2-017")
    pub spot_number: String,

    /// Floor the spot belongs to
    pub floor_id: i32,

    /// Garage the floor belongs to
    pub garage_id: i32,

    /// Garage display name
    pub garage_name: String,

    /// Current availability
    pub status: SpotStatus,

    /// Whether the spot is in service at all
    pub is_active: bool,
}

impl Spot {
    /// True when a new reservation may claim this spot
    pub fn is_reservable(&self) -> bool {
        self.is_active && self.status == SpotStatus::Available
    }
}

//! Vehicle model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vehicle entity (read-only to the reservation engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique identifier
    pub id: i32,

    /// License plate, used for log lines only
    pub license_plate: String,

    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn new(id: i32, license_plate: impl Into<String>) -> Self {
        Self {
            id,
            license_plate: license_plate.into(),
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

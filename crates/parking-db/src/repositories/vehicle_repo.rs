//! Vehicle repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{models::Vehicle, traits::VehicleStore, AppResult};
use tracing::{debug, instrument};

use crate::store::{db_error, PgParkingTx};

#[async_trait]
impl VehicleStore for PgParkingTx {
    #[instrument(skip(self))]
    async fn find_active_vehicle(&mut self, id: i32) -> AppResult<Option<Vehicle>> {
        debug!("Finding active vehicle by id: {}", id);

        let row = sqlx::query_as::<sqlx::Postgres, VehicleRow>(
            r#"
            SELECT id, license_plate, deleted_at
            FROM vehicles
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("find vehicle", e))?;

        Ok(row.map(Into::into))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: i32,
    license_plate: String,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: row.id,
            license_plate: row.license_plate,
            deleted_at: row.deleted_at,
        }
    }
}

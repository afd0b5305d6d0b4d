//! Spot repository implementation
//!
//! Status changes are single conditional `UPDATE ... WHERE status = expected`
//! statements, so a spot can only be claimed by one transaction.

use async_trait::async_trait;
use parking_core::{
    models::{Spot, SpotStatus},
    traits::SpotStore,
    AppResult,
};
use tracing::{debug, instrument};

use crate::store::{db_error, PgParkingTx};

const SPOT_SELECT: &str = r#"
    SELECT
        s.id, s.spot_number, s.floor_id,
        f.garage_id, g.name AS garage_name,
        s.status, s.is_active
    FROM parking_spots s
    JOIN floors f ON f.id = s.floor_id
    JOIN garages g ON g.id = f.garage_id
"#;

impl PgParkingTx {
    /// Convert database spot status string to enum
    fn parse_spot_status(s: &str) -> SpotStatus {
        SpotStatus::from_str(s).unwrap_or(SpotStatus::OutOfOrder)
    }
}

#[async_trait]
impl SpotStore for PgParkingTx {
    #[instrument(skip(self))]
    async fn find_spot(&mut self, id: i32) -> AppResult<Option<Spot>> {
        debug!("Finding spot by id: {}", id);

        let query = format!("{} WHERE s.id = $1", SPOT_SELECT);
        let row = sqlx::query_as::<sqlx::Postgres, SpotRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("find spot", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_spots(&mut self, ids: &[i32]) -> AppResult<Vec<Spot>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("{} WHERE s.id = ANY($1) ORDER BY s.id", SPOT_SELECT);
        let rows = sqlx::query_as::<sqlx::Postgres, SpotRow>(&query)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error("find spots", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_spot_status_if(
        &mut self,
        id: i32,
        expected: SpotStatus,
        new: SpotStatus,
    ) -> AppResult<bool> {
        debug!("Updating spot {} status {} -> {}", id, expected, new);

        let result = sqlx::query(
            r#"
            UPDATE parking_spots
            SET status = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.to_string())
        .bind(new.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("update spot status", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn bulk_update_spot_status_if(
        &mut self,
        ids: &[i32],
        expected: SpotStatus,
        new: SpotStatus,
    ) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE parking_spots
            SET status = $3,
                updated_at = NOW()
            WHERE id = ANY($1) AND status = $2
            "#,
        )
        .bind(ids)
        .bind(expected.to_string())
        .bind(new.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("bulk update spot status", e))?;

        debug!(
            "Bulk spot update {} -> {}: {} of {} applied",
            expected,
            new,
            result.rows_affected(),
            ids.len()
        );

        Ok(result.rows_affected())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct SpotRow {
    id: i32,
    spot_number: String,
    floor_id: i32,
    garage_id: i32,
    garage_name: String,
    status: String,
    is_active: bool,
}

impl From<SpotRow> for Spot {
    fn from(row: SpotRow) -> Self {
        Self {
            id: row.id,
            spot_number: row.spot_number,
            floor_id: row.floor_id,
            garage_id: row.garage_id,
            garage_name: row.garage_name,
            status: PgParkingTx::parse_spot_status(&row.status),
            is_active: row.is_active,
        }
    }
}

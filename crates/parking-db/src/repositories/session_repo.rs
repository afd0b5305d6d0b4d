//! Session repository implementation
//!
//! Filters are assembled with `sqlx::QueryBuilder` so every value is bound,
//! never spliced into the SQL text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{
    models::{
        KindFilter, NewSession, Session, SessionChanges, SessionFilter, SessionKind,
        SessionStatus,
    },
    traits::{Pagination, SessionStore},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::store::{db_error, PgParkingTx};

const SESSION_COLUMNS: &str = r#"
    ps.id, ps.vehicle_id, ps.spot_id, ps.user_id, ps.kind, ps.status,
    ps.start_time, ps.end_time, ps.hourly_rate, ps.total_amount,
    ps.amount_paid, ps.is_paid, ps.notes, ps.created_at, ps.updated_at
"#;

impl PgParkingTx {
    /// Convert database session status string to enum
    fn parse_session_status(s: &str) -> SessionStatus {
        SessionStatus::from_str(s).unwrap_or(SessionStatus::Cancelled)
    }

    /// Convert database kind string to enum
    fn parse_session_kind(s: &str) -> SessionKind {
        SessionKind::from_str(s).unwrap_or_default()
    }
}

/// Append `WHERE ...` for every set field of the filter
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &SessionFilter) {
    qb.push(" WHERE TRUE");

    if let Some(id) = filter.id {
        qb.push(" AND ps.id = ").push_bind(id);
    }
    if let Some(vehicle_id) = filter.vehicle_id {
        qb.push(" AND ps.vehicle_id = ").push_bind(vehicle_id);
    }
    if let Some(spot_id) = filter.spot_id {
        qb.push(" AND ps.spot_id = ").push_bind(spot_id);
    }
    if let Some(garage_id) = filter.garage_id {
        qb.push(
            " AND ps.spot_id IN (SELECT s.id FROM parking_spots s \
             JOIN floors f ON f.id = s.floor_id WHERE f.garage_id = ",
        )
        .push_bind(garage_id)
        .push(")");
    }
    match filter.kind {
        KindFilter::Any => {}
        KindFilter::Reservations => {
            qb.push(" AND ps.kind <> ")
                .push_bind(SessionKind::Occupancy.to_string());
        }
        KindFilter::Only(kind) => {
            qb.push(" AND ps.kind = ").push_bind(kind.to_string());
        }
    }
    if let Some(status) = filter.status {
        qb.push(" AND ps.status = ").push_bind(status.to_string());
    }
    // NULL end_time compares as unknown, so open-ended rows never match
    if let Some(t) = filter.ends_before {
        qb.push(" AND ps.end_time < ").push_bind(t);
    }
    if let Some(t) = filter.ends_after {
        qb.push(" AND ps.end_time > ").push_bind(t);
    }
}

/// Append `SET ...` for every set field of the change set
fn push_changes(qb: &mut QueryBuilder<'_, Postgres>, changes: &SessionChanges) {
    qb.push(" SET updated_at = NOW()");

    if let Some(kind) = changes.kind {
        qb.push(", kind = ").push_bind(kind.to_string());
    }
    if let Some(status) = changes.status {
        qb.push(", status = ").push_bind(status.to_string());
    }
    if let Some(start) = changes.start_time {
        qb.push(", start_time = ").push_bind(start);
    }
    if let Some(end) = changes.end_time {
        qb.push(", end_time = ").push_bind(end);
    }
    if let Some(rate) = changes.hourly_rate {
        qb.push(", hourly_rate = ").push_bind(rate);
    }
    if let Some(total) = changes.total_amount {
        qb.push(", total_amount = ").push_bind(total);
    }
    if let Some(paid) = changes.amount_paid {
        qb.push(", amount_paid = ").push_bind(paid);
    }
    if let Some(is_paid) = changes.is_paid {
        qb.push(", is_paid = ").push_bind(is_paid);
    }
    if let Some(notes) = &changes.notes {
        qb.push(", notes = ").push_bind(notes.clone());
    }
}

#[async_trait]
impl SessionStore for PgParkingTx {
    #[instrument(skip(self))]
    async fn find_session(&mut self, filter: &SessionFilter) -> AppResult<Option<Session>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(SESSION_COLUMNS).push(" FROM parking_sessions ps");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY ps.start_time DESC LIMIT 1");

        let row = qb
            .build_query_as::<SessionRow>()
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("find session", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_sessions(
        &mut self,
        filter: &SessionFilter,
        pagination: Option<&Pagination>,
    ) -> AppResult<Vec<Session>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(SESSION_COLUMNS).push(" FROM parking_sessions ps");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY ps.start_time DESC");

        if let Some(p) = pagination {
            qb.push(" LIMIT ")
                .push_bind(p.limit())
                .push(" OFFSET ")
                .push_bind(p.offset());
        }

        let rows = qb
            .build_query_as::<SessionRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| db_error("fetch sessions", e))?;

        debug!("Found {} sessions", rows.len());

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, session), fields(spot_id = session.spot_id, vehicle_id = session.vehicle_id))]
    async fn create_session(&mut self, session: &NewSession) -> AppResult<Session> {
        let query = format!(
            r#"
            INSERT INTO parking_sessions AS ps (
                id, vehicle_id, spot_id, user_id, kind, status,
                start_time, end_time, hourly_rate, total_amount,
                amount_paid, is_paid, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, SessionRow>(&query)
            .bind(Uuid::new_v4())
            .bind(session.vehicle_id)
            .bind(session.spot_id)
            .bind(session.user_id)
            .bind(session.kind.to_string())
            .bind(session.status.to_string())
            .bind(session.start_time)
            .bind(session.end_time)
            .bind(session.hourly_rate)
            .bind(session.total_amount)
            .bind(session.amount_paid)
            .bind(session.is_paid)
            .bind(&session.notes)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_error("create session", e))?;

        debug!("Created session {}", row.id);

        Ok(row.into())
    }

    #[instrument(skip(self, changes))]
    async fn update_session(&mut self, id: Uuid, changes: &SessionChanges) -> AppResult<Session> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE parking_sessions AS ps");
        push_changes(&mut qb, changes);
        qb.push(" WHERE ps.id = ").push_bind(id);
        qb.push(" RETURNING ").push(SESSION_COLUMNS);

        let row = qb
            .build_query_as::<SessionRow>()
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("update session", e))?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;

        Ok(row.into())
    }

    #[instrument(skip(self, changes), fields(count = ids.len()))]
    async fn bulk_update_sessions(
        &mut self,
        ids: &[Uuid],
        changes: &SessionChanges,
    ) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE parking_sessions AS ps");
        push_changes(&mut qb, changes);
        qb.push(" WHERE ps.id = ANY(").push_bind(ids.to_vec()).push(")");

        let result = qb
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("bulk update sessions", e))?;

        Ok(result.rows_affected())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    vehicle_id: i32,
    spot_id: i32,
    user_id: Option<i32>,
    kind: String,
    status: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    hourly_rate: Decimal,
    total_amount: Decimal,
    amount_paid: Decimal,
    is_paid: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            vehicle_id: row.vehicle_id,
            spot_id: row.spot_id,
            user_id: row.user_id,
            kind: PgParkingTx::parse_session_kind(&row.kind),
            status: PgParkingTx::parse_session_status(&row.status),
            start_time: row.start_time,
            end_time: row.end_time,
            hourly_rate: row.hourly_rate,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            is_paid: row.is_paid,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_enums() {
        assert_eq!(
            PgParkingTx::parse_session_status("EXPIRED"),
            SessionStatus::Expired
        );
        assert_eq!(
            PgParkingTx::parse_session_kind("used_reservation"),
            SessionKind::UsedReservation
        );
        assert_eq!(PgParkingTx::parse_session_kind("bogus"), SessionKind::Occupancy);
    }

    #[test]
    fn test_filter_sql() {
        let now = Utc::now();
        let filter = SessionFilter::reservations()
            .vehicle(9)
            .garage(Some(2))
            .status(SessionStatus::Active)
            .ends_before(now);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM parking_sessions ps");
        push_filter(&mut qb, &filter);
        let sql = qb.sql();

        assert!(sql.contains("ps.vehicle_id = $1"));
        assert!(sql.contains("f.garage_id = $2"));
        assert!(sql.contains("ps.kind <> $3"));
        assert!(sql.contains("ps.status = $4"));
        assert!(sql.contains("ps.end_time < $5"));
        assert!(!sql.contains("ps.end_time >"));
    }

    #[test]
    fn test_changes_sql() {
        let changes = SessionChanges {
            status: Some(SessionStatus::Cancelled),
            end_time: Some(None),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE parking_sessions AS ps");
        push_changes(&mut qb, &changes);
        let sql = qb.sql();

        assert!(sql.starts_with("UPDATE parking_sessions AS ps SET updated_at = NOW()"));
        assert!(sql.contains("status = $1"));
        assert!(sql.contains("end_time = $2"));
        assert!(!sql.contains("notes"));
    }
}

//! In-memory store
//!
//! Transactions hold an owned lock on the shared state for their whole
//! lifetime and work on a private copy, so they are fully serialized: a
//! transaction either commits its copy back or leaves the state untouched
//! when dropped.

use async_trait::async_trait;
use parking_core::{
    models::{NewSession, Session, SessionChanges, SessionFilter, Spot, SpotStatus, Vehicle},
    traits::{
        Pagination, SessionStore, SpotStore, StoreTransaction, TransactionCoordinator,
        VehicleStore,
    },
    AppError, AppResult, Clock, SystemClock,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    spots: BTreeMap<i32, Spot>,
    vehicles: BTreeMap<i32, Vehicle>,
    sessions: BTreeMap<Uuid, Session>,
    /// Committed row writes since the store was created
    writes: u64,
}

impl MemoryState {
    fn spot_in_garage(&self, spot_id: i32, garage_id: i32) -> bool {
        self.spots
            .get(&spot_id)
            .is_some_and(|spot| spot.garage_id == garage_id)
    }

    fn matching_sessions(&self, filter: &SessionFilter) -> Vec<Session> {
        let mut found: Vec<Session> = self
            .sessions
            .values()
            .filter(|s| filter.matches(s))
            .filter(|s| {
                filter
                    .garage_id
                    .map_or(true, |g| self.spot_in_garage(s.spot_id, g))
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        found
    }
}

/// Shared in-memory backing store
#[derive(Clone)]
pub struct MemoryParkingStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryParkingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryParkingStore {
    /// Create an empty store stamping rows with wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping rows with the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }

    // ==================== Seeding ====================

    pub async fn insert_spot(&self, spot: Spot) {
        self.state.lock().await.spots.insert(spot.id, spot);
    }

    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        self.state.lock().await.vehicles.insert(vehicle.id, vehicle);
    }

    /// Insert a session row as-is, keeping its id and timestamps
    pub async fn insert_session(&self, session: Session) {
        self.state.lock().await.sessions.insert(session.id, session);
    }

    // ==================== Snapshots ====================

    pub async fn spot(&self, id: i32) -> Option<Spot> {
        self.state.lock().await.spots.get(&id).cloned()
    }

    pub async fn session(&self, id: Uuid) -> Option<Session> {
        self.state.lock().await.sessions.get(&id).cloned()
    }

    /// Every session row, newest start time first
    pub async fn sessions(&self) -> Vec<Session> {
        self.state
            .lock()
            .await
            .matching_sessions(&SessionFilter::default())
    }

    /// Number of committed row writes
    pub async fn write_count(&self) -> u64 {
        self.state.lock().await.writes
    }
}

/// An open in-memory transaction
pub struct MemoryParkingTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl TransactionCoordinator for MemoryParkingStore {
    type Tx = MemoryParkingTx;

    async fn begin(&self) -> AppResult<MemoryParkingTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();

        Ok(MemoryParkingTx {
            guard,
            working,
            clock: Arc::clone(&self.clock),
        })
    }
}

#[async_trait]
impl StoreTransaction for MemoryParkingTx {
    async fn commit(self) -> AppResult<()> {
        let MemoryParkingTx {
            mut guard, working, ..
        } = self;
        debug!(writes = working.writes - guard.writes, "Committing memory transaction");
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl SpotStore for MemoryParkingTx {
    async fn find_spot(&mut self, id: i32) -> AppResult<Option<Spot>> {
        Ok(self.working.spots.get(&id).cloned())
    }

    async fn find_spots(&mut self, ids: &[i32]) -> AppResult<Vec<Spot>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.spots.get(id).cloned())
            .collect())
    }

    async fn update_spot_status_if(
        &mut self,
        id: i32,
        expected: SpotStatus,
        new: SpotStatus,
    ) -> AppResult<bool> {
        match self.working.spots.get_mut(&id) {
            Some(spot) if spot.status == expected => {
                spot.status = new;
                self.working.writes += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn bulk_update_spot_status_if(
        &mut self,
        ids: &[i32],
        expected: SpotStatus,
        new: SpotStatus,
    ) -> AppResult<u64> {
        let mut updated = 0;
        for id in ids {
            if self.update_spot_status_if(*id, expected, new).await? {
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl VehicleStore for MemoryParkingTx {
    async fn find_active_vehicle(&mut self, id: i32) -> AppResult<Option<Vehicle>> {
        Ok(self
            .working
            .vehicles
            .get(&id)
            .filter(|v| !v.is_deleted())
            .cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryParkingTx {
    async fn find_session(&mut self, filter: &SessionFilter) -> AppResult<Option<Session>> {
        Ok(self.working.matching_sessions(filter).into_iter().next())
    }

    async fn find_sessions(
        &mut self,
        filter: &SessionFilter,
        pagination: Option<&Pagination>,
    ) -> AppResult<Vec<Session>> {
        let found = self.working.matching_sessions(filter);

        Ok(match pagination {
            Some(p) => found
                .into_iter()
                .skip(usize::try_from(p.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(p.limit()).unwrap_or(usize::MAX))
                .collect(),
            None => found,
        })
    }

    async fn create_session(&mut self, session: &NewSession) -> AppResult<Session> {
        let created = session.clone().into_session(self.clock.now());
        self.working.sessions.insert(created.id, created.clone());
        self.working.writes += 1;
        Ok(created)
    }

    async fn update_session(&mut self, id: Uuid, changes: &SessionChanges) -> AppResult<Session> {
        let now = self.clock.now();
        let session = self
            .working
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;

        changes.apply(session, now);
        let updated = session.clone();
        self.working.writes += 1;
        Ok(updated)
    }

    async fn bulk_update_sessions(
        &mut self,
        ids: &[Uuid],
        changes: &SessionChanges,
    ) -> AppResult<u64> {
        let now = self.clock.now();
        let mut updated = 0;
        for id in ids {
            if let Some(session) = self.working.sessions.get_mut(id) {
                changes.apply(session, now);
                updated += 1;
            }
        }
        self.working.writes += updated;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_core::models::{SessionKind, SessionStatus};
    use rust_decimal_macros::dec;

    fn spot(id: i32, garage_id: i32) -> Spot {
        Spot {
            id,
            spot_number: format!("A-{:02}", id),
            floor_id: 1,
            garage_id,
            garage_name: format!("Garage {}", garage_id),
            status: SpotStatus::Available,
            is_active: true,
        }
    }

    fn new_session(spot_id: i32, kind: SessionKind) -> NewSession {
        NewSession {
            vehicle_id: 1,
            spot_id,
            user_id: None,
            kind,
            status: SessionStatus::Active,
            start_time: Utc::now(),
            end_time: None,
            hourly_rate: dec!(0),
            total_amount: dec!(0),
            amount_paid: dec!(0),
            is_paid: true,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryParkingStore::new();
        store.insert_spot(spot(1, 1)).await;

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx
                .update_spot_status_if(1, SpotStatus::Available, SpotStatus::Reserved)
                .await
                .unwrap());
            tx.create_session(&new_session(1, SessionKind::Reservation))
                .await
                .unwrap();
        }

        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Available);
        assert!(store.sessions().await.is_empty());
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryParkingStore::new();
        store.insert_spot(spot(1, 1)).await;

        let mut tx = store.begin().await.unwrap();
        tx.update_spot_status_if(1, SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap();
        // Guard no longer holds
        assert!(!tx
            .update_spot_status_if(1, SpotStatus::Available, SpotStatus::Occupied)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Reserved);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_garage_filter() {
        let store = MemoryParkingStore::new();
        store.insert_spot(spot(1, 1)).await;
        store.insert_spot(spot(2, 2)).await;

        let mut tx = store.begin().await.unwrap();
        tx.create_session(&new_session(1, SessionKind::Reservation))
            .await
            .unwrap();
        tx.create_session(&new_session(2, SessionKind::Reservation))
            .await
            .unwrap();

        let in_garage = tx
            .find_sessions(&SessionFilter::reservations().garage(Some(2)), None)
            .await
            .unwrap();
        assert_eq!(in_garage.len(), 1);
        assert_eq!(in_garage[0].spot_id, 2);
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let store = MemoryParkingStore::new();
        let mut tx = store.begin().await.unwrap();

        let result = tx
            .update_session(Uuid::new_v4(), &SessionChanges::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}

//! Reservation engine
//!
//! Manages temporary holds on parking spots:
//! - Create reservations, claiming the spot
//! - Convert a reservation into an occupancy when the vehicle arrives
//! - Cancel reservations and release the spot
//! - Expire lapsed reservations in bulk
//! - Query reservations and aggregate statistics
//!
//! A reservation is stored as a session row of kind `Reservation`. Its
//! status is never cached; it is derived from the row and the clock on every
//! read, so a lapsed hold reads as expired before the cleanup pass runs.

use chrono::{DateTime, Duration, Utc};
use parking_core::{
    config::ReservationConfig,
    models::{
        cancelled_reservation_note, derive_reservation_status, reservation_note,
        used_reservation_note, CreateReservationRequest, KindFilter, NewSession,
        ReservationStats, ReservationView, Session, SessionChanges, SessionFilter, SessionKind,
        SessionStatus, SpotStatus, StatsEntry, EXPIRED_RESERVATION_NOTE,
    },
    traits::{
        Pagination, RateLookup, SessionStore, SpotStore, StoreTransaction,
        TransactionCoordinator, VehicleStore,
    },
    AppError, AppResult, Clock,
};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Reservation engine
///
/// Stateless apart from its collaborators; safe to share behind an `Arc`
/// across tasks.
pub struct ReservationEngine<C: TransactionCoordinator, R: RateLookup> {
    coordinator: Arc<C>,
    rates: Arc<R>,
    clock: Arc<dyn Clock>,
    config: ReservationConfig,
}

impl<C: TransactionCoordinator, R: RateLookup> ReservationEngine<C, R> {
    /// Create a new reservation engine
    pub fn new(
        coordinator: Arc<C>,
        rates: Arc<R>,
        clock: Arc<dyn Clock>,
        config: ReservationConfig,
    ) -> Self {
        Self {
            coordinator,
            rates,
            clock,
            config,
        }
    }

    /// Filter matching a single open, unused reservation
    fn open_reservation(id: Uuid) -> SessionFilter {
        SessionFilter::default()
            .id(id)
            .kind(KindFilter::Only(SessionKind::Reservation))
            .status(SessionStatus::Active)
    }

    fn project(sessions: Vec<Session>, now: DateTime<Utc>) -> Vec<ReservationView> {
        sessions
            .into_iter()
            .filter_map(|s| ReservationView::from_session(s, now))
            .collect()
    }

    fn view(session: Session, now: DateTime<Utc>) -> AppResult<ReservationView> {
        let id = session.id;
        ReservationView::from_session(session, now)
            .ok_or_else(|| AppError::Internal(format!("Session {} is not a reservation", id)))
    }

    /// Hold duration for a request
    fn duration_for(&self, request: &CreateReservationRequest) -> AppResult<Duration> {
        let minutes = request
            .duration_minutes
            .unwrap_or(self.config.default_duration_minutes);

        if minutes < 1 || minutes > self.config.max_duration_minutes {
            return Err(AppError::InvalidInput(format!(
                "Reservation duration must be between 1 and {} minutes, got {}",
                self.config.max_duration_minutes, minutes
            )));
        }

        Ok(Duration::minutes(minutes))
    }

    /// A storage-level conflict while claiming a spot means another
    /// transaction claimed it first
    fn lost_claim(err: AppError, spot: impl std::fmt::Display) -> AppError {
        match err {
            AppError::Conflict(detail) => {
                warn!("Spot {} was claimed concurrently: {}", spot, detail);
                AppError::SpotUnavailable(format!("Spot {} was claimed concurrently", spot))
            }
            other => other,
        }
    }

    /// Create a new reservation
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The request fails validation
    /// - The spot is missing, inactive, not available, or claimed concurrently
    /// - The vehicle is missing or soft-deleted
    /// - The vehicle already has an active session
    /// - The store fails
    #[instrument(skip(self), fields(spot_id = request.spot_id, vehicle_id = request.vehicle_id))]
    pub async fn create_reservation(
        &self,
        request: CreateReservationRequest,
    ) -> AppResult<ReservationView> {
        request.validate()?;
        let duration = self.duration_for(&request)?;
        let spot_id = request.spot_id;

        self.reserve(request, duration)
            .await
            .map_err(|e| Self::lost_claim(e, spot_id))
    }

    async fn reserve(
        &self,
        request: CreateReservationRequest,
        duration: Duration,
    ) -> AppResult<ReservationView> {
        let now = self.clock.now();

        let mut tx = self.coordinator.begin().await?;

        let spot = tx
            .find_spot(request.spot_id)
            .await?
            .filter(|spot| spot.is_reservable())
            .ok_or_else(|| {
                AppError::SpotUnavailable(format!(
                    "Spot {} is not available for reservation",
                    request.spot_id
                ))
            })?;

        let vehicle = tx
            .find_active_vehicle(request.vehicle_id)
            .await?
            .ok_or_else(|| AppError::VehicleNotFound(request.vehicle_id.to_string()))?;

        let active = SessionFilter::default()
            .vehicle(vehicle.id)
            .status(SessionStatus::Active);
        if let Some(existing) = tx.find_session(&active).await? {
            debug!(
                "Vehicle {} already has active session {}",
                vehicle.license_plate, existing.id
            );
            return Err(AppError::VehicleAlreadyParked(vehicle.license_plate));
        }

        if !tx
            .update_spot_status_if(spot.id, SpotStatus::Available, SpotStatus::Reserved)
            .await?
        {
            warn!("Spot {} was claimed concurrently", spot.spot_number);
            return Err(AppError::SpotUnavailable(format!(
                "Spot {} is not available for reservation",
                spot.spot_number
            )));
        }

        let session = tx
            .create_session(&NewSession {
                vehicle_id: vehicle.id,
                spot_id: spot.id,
                user_id: request.user_id,
                kind: SessionKind::Reservation,
                status: SessionStatus::Active,
                start_time: now,
                end_time: Some(now + duration),
                hourly_rate: Decimal::ZERO,
                total_amount: Decimal::ZERO,
                amount_paid: Decimal::ZERO,
                is_paid: true,
                notes: Some(reservation_note(request.notes.as_deref())),
            })
            .await?;

        tx.commit().await?;

        info!(
            "Created reservation {} for spot {} (vehicle {}) until {}",
            session.id,
            spot.spot_number,
            vehicle.license_plate,
            now + duration
        );

        let mut spot = spot;
        spot.status = SpotStatus::Reserved;

        Ok(Self::view(session, now)?
            .with_spot(Some(spot))
            .with_vehicle(Some(vehicle)))
    }

    /// Find a reservation by id, with spot and vehicle snapshots
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReservationView>> {
        let now = self.clock.now();
        let mut tx = self.coordinator.begin().await?;

        let Some(session) = tx.find_session(&SessionFilter::reservations().id(id)).await? else {
            return Ok(None);
        };

        let spot = tx.find_spot(session.spot_id).await?;
        let vehicle = tx.find_active_vehicle(session.vehicle_id).await?;
        tx.commit().await?;

        Ok(ReservationView::from_session(session, now)
            .map(|view| view.with_spot(spot).with_vehicle(vehicle)))
    }

    /// All reservations of a vehicle, newest first
    #[instrument(skip(self))]
    pub async fn find_by_vehicle_id(
        &self,
        vehicle_id: i32,
        pagination: Option<Pagination>,
    ) -> AppResult<Vec<ReservationView>> {
        self.query(SessionFilter::reservations().vehicle(vehicle_id), pagination)
            .await
    }

    /// All reservations of a spot, newest first
    #[instrument(skip(self))]
    pub async fn find_by_spot_id(
        &self,
        spot_id: i32,
        pagination: Option<Pagination>,
    ) -> AppResult<Vec<ReservationView>> {
        self.query(SessionFilter::reservations().spot(spot_id), pagination)
            .await
    }

    /// Unused reservations whose window is still open
    #[instrument(skip(self))]
    pub async fn find_active_reservations(
        &self,
        pagination: Option<Pagination>,
    ) -> AppResult<Vec<ReservationView>> {
        let now = self.clock.now();
        let filter = SessionFilter::default()
            .kind(KindFilter::Only(SessionKind::Reservation))
            .status(SessionStatus::Active)
            .ends_after(now);

        self.query_at(filter, pagination, now).await
    }

    /// Unused reservations whose window lapsed but which are not yet expired
    /// by the cleanup pass
    #[instrument(skip(self))]
    pub async fn find_expired_reservations(
        &self,
        pagination: Option<Pagination>,
    ) -> AppResult<Vec<ReservationView>> {
        let now = self.clock.now();
        let filter = SessionFilter::default()
            .kind(KindFilter::Only(SessionKind::Reservation))
            .status(SessionStatus::Active)
            .ends_before(now);

        self.query_at(filter, pagination, now).await
    }

    async fn query(
        &self,
        filter: SessionFilter,
        pagination: Option<Pagination>,
    ) -> AppResult<Vec<ReservationView>> {
        let now = self.clock.now();
        self.query_at(filter, pagination, now).await
    }

    async fn query_at(
        &self,
        filter: SessionFilter,
        pagination: Option<Pagination>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ReservationView>> {
        let mut tx = self.coordinator.begin().await?;
        let sessions = tx.find_sessions(&filter, pagination.as_ref()).await?;
        tx.commit().await?;

        debug!("Query returned {} reservations", sessions.len());

        Ok(Self::project(sessions, now))
    }

    /// Convert a reservation into an occupancy session
    ///
    /// The session row is reused: its kind becomes `UsedReservation`, the
    /// clock starts at `actual_start_time` (or now), the end time is cleared
    /// and billing is reset with the spot's hourly rate.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No open, unused reservation has this id (`ReservationNotFound`)
    /// - The reservation window has lapsed (`ReservationExpired`)
    /// - The spot is no longer reserved (`SpotUnavailable`)
    #[instrument(skip(self))]
    pub async fn use_reservation(
        &self,
        id: Uuid,
        actual_start_time: Option<DateTime<Utc>>,
    ) -> AppResult<Session> {
        self.occupy(id, actual_start_time)
            .await
            .map_err(|e| Self::lost_claim(e, format!("for reservation {}", id)))
    }

    async fn occupy(
        &self,
        id: Uuid,
        actual_start_time: Option<DateTime<Utc>>,
    ) -> AppResult<Session> {
        let now = self.clock.now();
        let mut tx = self.coordinator.begin().await?;

        let session = tx
            .find_session(&Self::open_reservation(id))
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        if session.end_time.is_some_and(|end| end < now) {
            return Err(AppError::ReservationExpired(id.to_string()));
        }

        let spot = tx.find_spot(session.spot_id).await?.ok_or_else(|| {
            AppError::SpotUnavailable(format!("Spot {} no longer exists", session.spot_id))
        })?;

        if !tx
            .update_spot_status_if(spot.id, SpotStatus::Reserved, SpotStatus::Occupied)
            .await?
        {
            warn!(
                "Spot {} is {} instead of RESERVED; reservation {} cannot be used",
                spot.spot_number, spot.status, id
            );
            return Err(AppError::SpotUnavailable(format!(
                "Spot {} is no longer reserved",
                spot.spot_number
            )));
        }

        let hourly_rate = self.rates.hourly_rate(&spot).await?;

        let changes = SessionChanges {
            kind: Some(SessionKind::UsedReservation),
            start_time: Some(actual_start_time.unwrap_or(now)),
            end_time: Some(None),
            hourly_rate: Some(hourly_rate),
            total_amount: Some(Decimal::ZERO),
            amount_paid: Some(Decimal::ZERO),
            is_paid: Some(false),
            notes: Some(used_reservation_note(session.notes.as_deref())),
            ..Default::default()
        };
        let updated = tx.update_session(id, &changes).await?;

        tx.commit().await?;

        info!(
            "Reservation {} used: spot {} occupied at {}/h",
            id, spot.spot_number, hourly_rate
        );

        Ok(updated)
    }

    /// Cancel an open reservation and release its spot
    ///
    /// The spot goes back to AVAILABLE only if it is still RESERVED. A lapsed
    /// reservation that cleanup has not reached yet can still be cancelled.
    /// A storage-level conflict is returned as `AppError::Conflict` and
    /// nothing is written; the caller may retry.
    #[instrument(skip(self))]
    pub async fn cancel_reservation(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> AppResult<ReservationView> {
        let now = self.clock.now();
        let mut tx = self.coordinator.begin().await?;

        let session = tx
            .find_session(&Self::open_reservation(id))
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        let changes = SessionChanges {
            status: Some(SessionStatus::Cancelled),
            notes: Some(cancelled_reservation_note(
                session.notes.as_deref(),
                reason.as_deref(),
            )),
            ..Default::default()
        };
        let updated = tx.update_session(id, &changes).await?;

        let released = tx
            .update_spot_status_if(session.spot_id, SpotStatus::Reserved, SpotStatus::Available)
            .await?;
        if !released {
            warn!(
                "Spot {} was no longer RESERVED when reservation {} was cancelled; left unchanged",
                session.spot_id, id
            );
        }

        let spot = tx.find_spot(session.spot_id).await?;
        tx.commit().await?;

        info!(
            "Cancelled reservation {} ({})",
            id,
            reason.as_deref().unwrap_or("no reason")
        );

        Ok(Self::view(updated, now)?.with_spot(spot))
    }

    /// Expire every lapsed reservation and release its spot
    ///
    /// Returns the number of reservations expired. A run with nothing to do
    /// writes nothing.
    #[instrument(skip(self))]
    pub async fn cleanup_expired_reservations(&self) -> AppResult<u64> {
        let now = self.clock.now();
        let mut tx = self.coordinator.begin().await?;

        let filter = SessionFilter::default()
            .kind(KindFilter::Only(SessionKind::Reservation))
            .status(SessionStatus::Active)
            .ends_before(now);
        let lapsed = tx.find_sessions(&filter, None).await?;

        if lapsed.is_empty() {
            debug!("No expired reservations to clean up");
            return Ok(0);
        }

        let ids: Vec<Uuid> = lapsed.iter().map(|s| s.id).collect();
        let spot_ids: Vec<i32> = lapsed
            .iter()
            .map(|s| s.spot_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let changes = SessionChanges {
            status: Some(SessionStatus::Expired),
            notes: Some(EXPIRED_RESERVATION_NOTE.to_string()),
            ..Default::default()
        };
        let expired = tx.bulk_update_sessions(&ids, &changes).await?;

        let released = tx
            .bulk_update_spot_status_if(&spot_ids, SpotStatus::Reserved, SpotStatus::Available)
            .await?;

        tx.commit().await?;

        info!(
            "Expired {} reservations, released {} of {} spots",
            expired,
            released,
            spot_ids.len()
        );

        Ok(expired)
    }

    /// Aggregate reservation statistics, optionally for one garage
    #[instrument(skip(self))]
    pub async fn get_stats(&self, garage_id: Option<i32>) -> AppResult<ReservationStats> {
        let now = self.clock.now();
        let mut tx = self.coordinator.begin().await?;

        let sessions = tx
            .find_sessions(&SessionFilter::reservations().garage(garage_id), None)
            .await?;

        let spot_ids: Vec<i32> = sessions
            .iter()
            .map(|s| s.spot_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let garages: HashMap<i32, String> = tx
            .find_spots(&spot_ids)
            .await?
            .into_iter()
            .map(|spot| (spot.id, spot.garage_name))
            .collect();

        tx.commit().await?;

        let entries = sessions.iter().filter_map(|s| {
            derive_reservation_status(s.kind, s.status, s.end_time, now).map(|status| StatsEntry {
                status,
                garage_name: garages.get(&s.spot_id).cloned(),
                duration_minutes: s.duration_minutes(),
            })
        });

        Ok(ReservationStats::collect(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::ConfiguredRateLookup;
    use async_trait::async_trait;
    use parking_core::{
        models::{ReservationStatus, Spot, Vehicle},
        ManualClock,
    };
    use parking_db::{MemoryParkingStore, MemoryParkingTx};
    use rust_decimal_macros::dec;

    type MemoryEngine = ReservationEngine<MemoryParkingStore, ConfiguredRateLookup>;

    fn engine(config: ReservationConfig) -> MemoryEngine {
        ReservationEngine::new(
            Arc::new(MemoryParkingStore::new()),
            Arc::new(ConfiguredRateLookup::new(dec!(5.00))),
            Arc::new(ManualClock::default()),
            config,
        )
    }

    /// Memory store whose conditional spot writes always lose a
    /// storage-level race, the way a serializable PostgreSQL transaction does
    struct ContendedStore(MemoryParkingStore);

    struct ContendedTx(MemoryParkingTx);

    fn conflict() -> AppError {
        AppError::Conflict("could not serialize access due to concurrent update".to_string())
    }

    #[async_trait]
    impl TransactionCoordinator for ContendedStore {
        type Tx = ContendedTx;

        async fn begin(&self) -> AppResult<ContendedTx> {
            Ok(ContendedTx(self.0.begin().await?))
        }
    }

    #[async_trait]
    impl SpotStore for ContendedTx {
        async fn find_spot(&mut self, id: i32) -> AppResult<Option<Spot>> {
            self.0.find_spot(id).await
        }

        async fn find_spots(&mut self, ids: &[i32]) -> AppResult<Vec<Spot>> {
            self.0.find_spots(ids).await
        }

        async fn update_spot_status_if(
            &mut self,
            _id: i32,
            _expected: SpotStatus,
            _new: SpotStatus,
        ) -> AppResult<bool> {
            Err(conflict())
        }

        async fn bulk_update_spot_status_if(
            &mut self,
            _ids: &[i32],
            _expected: SpotStatus,
            _new: SpotStatus,
        ) -> AppResult<u64> {
            Err(conflict())
        }
    }

    #[async_trait]
    impl VehicleStore for ContendedTx {
        async fn find_active_vehicle(&mut self, id: i32) -> AppResult<Option<Vehicle>> {
            self.0.find_active_vehicle(id).await
        }
    }

    #[async_trait]
    impl SessionStore for ContendedTx {
        async fn find_session(&mut self, filter: &SessionFilter) -> AppResult<Option<Session>> {
            self.0.find_session(filter).await
        }

        async fn find_sessions(
            &mut self,
            filter: &SessionFilter,
            pagination: Option<&Pagination>,
        ) -> AppResult<Vec<Session>> {
            self.0.find_sessions(filter, pagination).await
        }

        async fn create_session(&mut self, session: &NewSession) -> AppResult<Session> {
            self.0.create_session(session).await
        }

        async fn update_session(
            &mut self,
            id: Uuid,
            changes: &SessionChanges,
        ) -> AppResult<Session> {
            self.0.update_session(id, changes).await
        }

        async fn bulk_update_sessions(
            &mut self,
            ids: &[Uuid],
            changes: &SessionChanges,
        ) -> AppResult<u64> {
            self.0.bulk_update_sessions(ids, changes).await
        }
    }

    #[async_trait]
    impl StoreTransaction for ContendedTx {
        async fn commit(self) -> AppResult<()> {
            self.0.commit().await
        }
    }

    /// One available spot and one vehicle, seen through an engine over the
    /// plain store and an engine over the same state that loses every spot
    /// write
    struct Contended {
        store: MemoryParkingStore,
        clock: Arc<ManualClock>,
        plain: MemoryEngine,
        losing: ReservationEngine<ContendedStore, ConfiguredRateLookup>,
    }

    async fn contended() -> Contended {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryParkingStore::with_clock(clock.clone());
        store
            .insert_spot(Spot {
                id: 1,
                spot_number: "P-01".to_string(),
                floor_id: 1,
                garage_id: 1,
                garage_name: "Central".to_string(),
                status: SpotStatus::Available,
                is_active: true,
            })
            .await;
        store.insert_vehicle(Vehicle::new(1, "ABC-001")).await;

        let rates = Arc::new(ConfiguredRateLookup::new(dec!(5.00)));
        let plain = ReservationEngine::new(
            Arc::new(store.clone()),
            rates.clone(),
            clock.clone(),
            ReservationConfig::default(),
        );
        let losing = ReservationEngine::new(
            Arc::new(ContendedStore(store.clone())),
            rates,
            clock.clone(),
            ReservationConfig::default(),
        );

        Contended {
            store,
            clock,
            plain,
            losing,
        }
    }

    #[tokio::test]
    async fn test_duration_checked_before_store_access() {
        let engine = engine(ReservationConfig::default());

        let too_long = CreateReservationRequest::new(1, 1).with_duration(1441);
        assert!(matches!(
            engine.create_reservation(too_long).await,
            Err(AppError::InvalidInput(_))
        ));

        let zero = CreateReservationRequest::new(1, 1).with_duration(0);
        assert!(matches!(
            engine.create_reservation(zero).await,
            Err(AppError::Validation(_))
        ));

        // A valid request reaches the (empty) store
        let ok = CreateReservationRequest::new(1, 1);
        assert!(matches!(
            engine.create_reservation(ok).await,
            Err(AppError::SpotUnavailable(_))
        ));
    }

    #[test]
    fn test_default_duration() {
        let engine = engine(ReservationConfig {
            default_duration_minutes: 45,
            ..Default::default()
        });

        let duration = engine
            .duration_for(&CreateReservationRequest::new(1, 1))
            .unwrap();
        assert_eq!(duration, Duration::minutes(45));
    }

    #[test]
    fn test_open_reservation_filter() {
        let id = Uuid::new_v4();
        let filter = MemoryEngine::open_reservation(id);
        assert_eq!(filter.id, Some(id));
        assert_eq!(filter.kind, KindFilter::Only(SessionKind::Reservation));
        assert_eq!(filter.status, Some(SessionStatus::Active));
    }

    #[tokio::test]
    async fn test_unknown_reservation() {
        let engine = engine(ReservationConfig::default());
        let id = Uuid::new_v4();

        assert!(engine.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            engine.use_reservation(id, None).await,
            Err(AppError::ReservationNotFound(_))
        ));
        assert!(matches!(
            engine.cancel_reservation(id, None).await,
            Err(AppError::ReservationNotFound(_))
        ));
        assert_eq!(engine.cleanup_expired_reservations().await.unwrap(), 0);
        assert_eq!(engine.get_stats(None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_create_reports_storage_conflict_as_unavailable() {
        let Contended { store, losing, .. } = contended().await;

        let result = losing
            .create_reservation(CreateReservationRequest::new(1, 1))
            .await;
        assert!(matches!(result, Err(AppError::SpotUnavailable(ref m)) if m.contains("Spot 1")));

        assert!(store.sessions().await.is_empty());
        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Available);
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_use_reports_storage_conflict_as_unavailable() {
        let Contended {
            store,
            plain,
            losing,
            ..
        } = contended().await;
        let view = plain
            .create_reservation(CreateReservationRequest::new(1, 1))
            .await
            .unwrap();

        assert!(matches!(
            losing.use_reservation(view.id, None).await,
            Err(AppError::SpotUnavailable(_))
        ));

        let session = store.session(view.id).await.unwrap();
        assert_eq!(session.kind, SessionKind::Reservation);
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Reserved);
    }

    #[tokio::test]
    async fn test_cancel_propagates_storage_conflict() {
        let Contended {
            store,
            plain,
            losing,
            ..
        } = contended().await;
        let view = plain
            .create_reservation(CreateReservationRequest::new(1, 1))
            .await
            .unwrap();
        let writes = store.write_count().await;

        assert!(matches!(
            losing.cancel_reservation(view.id, None).await,
            Err(AppError::Conflict(_))
        ));

        // Nothing from the aborted attempt is kept
        assert_eq!(store.write_count().await, writes);
        assert_eq!(
            store.session(view.id).await.unwrap().status,
            SessionStatus::Active
        );
        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Reserved);

        // A retry without contention succeeds
        let cancelled = plain.cancel_reservation(view.id, None).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Available);
    }

    #[tokio::test]
    async fn test_cleanup_propagates_storage_conflict() {
        let Contended {
            store,
            clock,
            plain,
            losing,
        } = contended().await;
        plain
            .create_reservation(CreateReservationRequest::new(1, 1).with_duration(10))
            .await
            .unwrap();
        clock.advance(Duration::minutes(11));

        assert!(matches!(
            losing.cleanup_expired_reservations().await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(store.spot(1).await.unwrap().status, SpotStatus::Reserved);
    }
}

//! Store and collaborator traits
//!
//! The engine never talks to a connection or a pool directly. It asks a
//! [`TransactionCoordinator`] for a transaction handle and issues every read
//! and write through that handle, so a whole operation commits or rolls back
//! as one unit. Dropping a handle without calling
//! [`StoreTransaction::commit`] rolls it back.

use crate::error::AppError;
use crate::models::{
    NewSession, Session, SessionChanges, SessionFilter, Spot, SpotStatus, Vehicle,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Spot access inside a transaction
#[async_trait]
pub trait SpotStore: Send {
    /// Find spot by ID
    async fn find_spot(&mut self, id: i32) -> Result<Option<Spot>, AppError>;

    /// Find several spots; missing ids are skipped
    async fn find_spots(&mut self, ids: &[i32]) -> Result<Vec<Spot>, AppError>;

    /// Set `new` only if the current status is `expected`. Returns whether
    /// the write applied.
    ///
    /// Fails with `AppError::Conflict` when a concurrent transaction wins
    /// the race at the storage level; the transaction is then unusable.
    async fn update_spot_status_if(
        &mut self,
        id: i32,
        expected: SpotStatus,
        new: SpotStatus,
    ) -> Result<bool, AppError>;

    /// Bulk variant of [`SpotStore::update_spot_status_if`]; returns the
    /// number of spots updated
    async fn bulk_update_spot_status_if(
        &mut self,
        ids: &[i32],
        expected: SpotStatus,
        new: SpotStatus,
    ) -> Result<u64, AppError>;
}

/// Vehicle access inside a transaction
#[async_trait]
pub trait VehicleStore: Send {
    /// Find a vehicle that has not been soft-deleted
    async fn find_active_vehicle(&mut self, id: i32) -> Result<Option<Vehicle>, AppError>;
}

/// Session access inside a transaction
#[async_trait]
pub trait SessionStore: Send {
    /// First session matching the filter
    async fn find_session(&mut self, filter: &SessionFilter) -> Result<Option<Session>, AppError>;

    /// All sessions matching the filter, newest start time first
    async fn find_sessions(
        &mut self,
        filter: &SessionFilter,
        pagination: Option<&Pagination>,
    ) -> Result<Vec<Session>, AppError>;

    /// Insert a new session row
    async fn create_session(&mut self, session: &NewSession) -> Result<Session, AppError>;

    /// Update one session row
    async fn update_session(
        &mut self,
        id: Uuid,
        changes: &SessionChanges,
    ) -> Result<Session, AppError>;

    /// Apply the same change set to several rows; returns rows affected
    async fn bulk_update_sessions(
        &mut self,
        ids: &[Uuid],
        changes: &SessionChanges,
    ) -> Result<u64, AppError>;
}

/// One open transaction spanning every store
#[async_trait]
pub trait StoreTransaction: SpotStore + VehicleStore + SessionStore + Sized {
    /// Make every write of this transaction durable
    async fn commit(self) -> Result<(), AppError>;
}

/// Opens transactions against the backing store
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    type Tx: StoreTransaction;

    /// Begin a new transaction
    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

/// Hourly rate applied when a reservation becomes a real occupancy
#[async_trait]
pub trait RateLookup: Send + Sync {
    async fn hourly_rate(&self, spot: &Spot) -> Result<Decimal, AppError>;
}

/// Pagination parameters
///
/// Always normalized: `page` is at least 1 and `per_page` is within
/// `1..=1000`, so `offset` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    per_page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Rows to skip; saturates instead of overflowing on absurd pages
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

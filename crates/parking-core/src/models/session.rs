//! Parking session model
//!
//! A session row records a vehicle occupying a spot. Reservations reuse the
//! same table: the `kind` discriminant tells a temporary hold apart from a
//! real occupancy, and the session id doubles as the reservation id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stored session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Expired,
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "ACTIVE"),
            SessionStatus::Completed => write!(f, "COMPLETED"),
            SessionStatus::Expired => write!(f, "EXPIRED"),
            SessionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl SessionStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(SessionStatus::Active),
            "COMPLETED" => Some(SessionStatus::Completed),
            "EXPIRED" => Some(SessionStatus::Expired),
            "CANCELLED" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

/// What a session row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Ordinary parking occupancy
    #[default]
    Occupancy,
    /// Temporary hold on a spot
    Reservation,
    /// A hold that was converted into an occupancy when the vehicle arrived
    UsedReservation,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Occupancy => write!(f, "occupancy"),
            SessionKind::Reservation => write!(f, "reservation"),
            SessionKind::UsedReservation => write!(f, "used_reservation"),
        }
    }
}

impl SessionKind {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "occupancy" => Some(SessionKind::Occupancy),
            "reservation" => Some(SessionKind::Reservation),
            "used_reservation" => Some(SessionKind::UsedReservation),
            _ => None,
        }
    }

    /// True for rows that belong to the reservation view
    pub fn is_reservation(&self) -> bool {
        !matches!(self, SessionKind::Occupancy)
    }
}

/// Parking session entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (also the reservation id)
    pub id: Uuid,

    pub vehicle_id: i32,

    pub spot_id: i32,

    /// User who requested the reservation, if any
    pub user_id: Option<i32>,

    pub kind: SessionKind,

    pub status: SessionStatus,

    pub start_time: DateTime<Utc>,

    /// Planned end of the session; `None` while an occupancy is open-ended
    pub end_time: Option<DateTime<Utc>>,

    pub hourly_rate: Decimal,

    pub total_amount: Decimal,

    pub amount_paid: Decimal,

    pub is_paid: bool,

    /// Free-text annotation
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Session length in minutes when both bounds are known
    pub fn duration_minutes(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds() as f64 / 60.0)
    }
}

/// Fields for a new session row
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub vehicle_id: i32,
    pub spot_id: i32,
    pub user_id: Option<i32>,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub hourly_rate: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub is_paid: bool,
    pub notes: Option<String>,
}

impl NewSession {
    /// Materialize the row as a store would, with a fresh id and timestamps
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            vehicle_id: self.vehicle_id,
            spot_id: self.spot_id,
            user_id: self.user_id,
            kind: self.kind,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            hourly_rate: self.hourly_rate,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            is_paid: self.is_paid,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a session row; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionChanges {
    pub kind: Option<SessionKind>,
    pub status: Option<SessionStatus>,
    pub start_time: Option<DateTime<Utc>>,
    /// `Some(None)` clears the end time
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub hourly_rate: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
    pub is_paid: Option<bool>,
    pub notes: Option<String>,
}

impl SessionChanges {
    /// Apply the change set to an in-memory row
    pub fn apply(&self, session: &mut Session, now: DateTime<Utc>) {
        if let Some(kind) = self.kind {
            session.kind = kind;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(start) = self.start_time {
            session.start_time = start;
        }
        if let Some(end) = self.end_time {
            session.end_time = end;
        }
        if let Some(rate) = self.hourly_rate {
            session.hourly_rate = rate;
        }
        if let Some(total) = self.total_amount {
            session.total_amount = total;
        }
        if let Some(paid) = self.amount_paid {
            session.amount_paid = paid;
        }
        if let Some(is_paid) = self.is_paid {
            session.is_paid = is_paid;
        }
        if let Some(notes) = &self.notes {
            session.notes = Some(notes.clone());
        }
        session.updated_at = now;
    }
}

/// Which kinds of session a query should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    Any,
    /// Every reservation-backed row, used or not
    Reservations,
    Only(SessionKind),
}

impl KindFilter {
    pub fn matches(&self, kind: SessionKind) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Reservations => kind.is_reservation(),
            KindFilter::Only(k) => *k == kind,
        }
    }
}

/// Session query filter; unset fields do not constrain the result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    pub id: Option<Uuid>,
    pub vehicle_id: Option<i32>,
    pub spot_id: Option<i32>,
    /// Resolved through spot → floor → garage
    pub garage_id: Option<i32>,
    pub kind: KindFilter,
    pub status: Option<SessionStatus>,
    /// `end_time < t`; rows without an end time never match
    pub ends_before: Option<DateTime<Utc>>,
    /// `end_time > t`; rows without an end time never match
    pub ends_after: Option<DateTime<Utc>>,
}

impl SessionFilter {
    /// Filter over reservation-backed rows only
    pub fn reservations() -> Self {
        Self {
            kind: KindFilter::Reservations,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn vehicle(mut self, vehicle_id: i32) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    pub fn spot(mut self, spot_id: i32) -> Self {
        self.spot_id = Some(spot_id);
        self
    }

    pub fn garage(mut self, garage_id: Option<i32>) -> Self {
        self.garage_id = garage_id;
        self
    }

    pub fn kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }

    pub fn status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn ends_before(mut self, t: DateTime<Utc>) -> Self {
        self.ends_before = Some(t);
        self
    }

    pub fn ends_after(mut self, t: DateTime<Utc>) -> Self {
        self.ends_after = Some(t);
        self
    }

    /// Evaluate every session-local condition (everything except `garage_id`)
    pub fn matches(&self, session: &Session) -> bool {
        if self.id.is_some_and(|id| id != session.id) {
            return false;
        }
        if self.vehicle_id.is_some_and(|v| v != session.vehicle_id) {
            return false;
        }
        if self.spot_id.is_some_and(|s| s != session.spot_id) {
            return false;
        }
        if !self.kind.matches(session.kind) {
            return false;
        }
        if self.status.is_some_and(|s| s != session.status) {
            return false;
        }
        if let Some(t) = self.ends_before {
            if !session.end_time.is_some_and(|end| end < t) {
                return false;
            }
        }
        if let Some(t) = self.ends_after {
            if !session.end_time.is_some_and(|end| end > t) {
                return false;
            }
        }
        true
    }
}

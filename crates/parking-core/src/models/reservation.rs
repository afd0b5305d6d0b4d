//! Reservation view and statistics
//!
//! There is no reservation table. A reservation is a session row whose kind is
//! `Reservation` or `UsedReservation`; its status is derived on every read from
//! the stored session status, the end time and the current instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::session::{Session, SessionKind, SessionStatus};
use super::spot::Spot;
use super::vehicle::Vehicle;

/// Legacy marker written at the start of reservation notes
pub const RESERVATION_MARKER: &str = "RESERVATION:";

/// Legacy marker written once a reservation has been used
pub const USED_RESERVATION_MARKER: &str = "USED_RESERVATION:";

/// Notes written by the expiry pass (overwrites any earlier note)
pub const EXPIRED_RESERVATION_NOTE: &str = "EXPIRED_RESERVATION: Automatically expired";

/// Note used when the caller supplies none
pub const DEFAULT_RESERVATION_NOTE: &str = "Auto-generated reservation";

/// Reason recorded when a cancellation supplies none
pub const DEFAULT_CANCEL_REASON: &str = "No reason provided";

/// Virtual reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Holding the spot
    Active,
    /// Window lapsed (lazily, or durably after cleanup)
    Expired,
    /// Converted into an occupancy session
    Used,
    /// Cancelled by the caller
    Cancelled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Active => write!(f, "ACTIVE"),
            ReservationStatus::Expired => write!(f, "EXPIRED"),
            ReservationStatus::Used => write!(f, "USED"),
            ReservationStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Classify a session row at instant `now`.
///
/// Returns `None` for ordinary occupancy sessions. A reservation whose window
/// has lapsed reads as `Expired` even while its stored status is still
/// `Active`; the cleanup pass makes that durable.
pub fn derive_reservation_status(
    kind: SessionKind,
    status: SessionStatus,
    end_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<ReservationStatus> {
    match kind {
        SessionKind::Occupancy => None,
        SessionKind::UsedReservation => Some(ReservationStatus::Used),
        SessionKind::Reservation => Some(match status {
            SessionStatus::Cancelled => ReservationStatus::Cancelled,
            // A hold closed without ever being used
            SessionStatus::Expired | SessionStatus::Completed => ReservationStatus::Expired,
            SessionStatus::Active => match end_time {
                Some(end) if end < now => ReservationStatus::Expired,
                _ => ReservationStatus::Active,
            },
        }),
    }
}

/// Notes for a freshly created reservation
pub fn reservation_note(note: Option<&str>) -> String {
    format!(
        "{} {}",
        RESERVATION_MARKER,
        note.unwrap_or(DEFAULT_RESERVATION_NOTE)
    )
}

/// Notes for a reservation converted into an occupancy
pub fn used_reservation_note(notes: Option<&str>) -> String {
    match notes {
        Some(n) if n.starts_with(RESERVATION_MARKER) => {
            n.replacen(RESERVATION_MARKER, USED_RESERVATION_MARKER, 1)
        }
        Some(n) => format!("{} {}", USED_RESERVATION_MARKER, n),
        None => format!("{} {}", USED_RESERVATION_MARKER, DEFAULT_RESERVATION_NOTE),
    }
}

/// Notes for a cancelled reservation
pub fn cancelled_reservation_note(notes: Option<&str>, reason: Option<&str>) -> String {
    format!(
        "{} - CANCELLED: {}",
        notes.unwrap_or_default(),
        reason.unwrap_or(DEFAULT_CANCEL_REASON)
    )
}

/// Reservation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateReservationRequest {
    pub spot_id: i32,

    pub vehicle_id: i32,

    pub user_id: Option<i32>,

    /// Hold length; the configured default applies when absent
    #[validate(range(min = 1, message = "duration must be at least one minute"))]
    pub duration_minutes: Option<i64>,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

impl CreateReservationRequest {
    pub fn new(spot_id: i32, vehicle_id: i32) -> Self {
        Self {
            spot_id,
            vehicle_id,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_user(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Read-time projection of a reservation-backed session row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationView {
    /// Same as the session id
    pub id: Uuid,
    pub spot_id: i32,
    pub vehicle_id: i32,
    pub user_id: Option<i32>,
    pub reserved_at: DateTime<Utc>,
    /// Session end time, or the read instant when the row has none
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub spot: Option<Spot>,
    pub vehicle: Option<Vehicle>,
    pub session: Option<Session>,
}

impl ReservationView {
    /// Project a session row; `None` when the row is an ordinary occupancy
    pub fn from_session(session: Session, now: DateTime<Utc>) -> Option<Self> {
        let status =
            derive_reservation_status(session.kind, session.status, session.end_time, now)?;

        Some(Self {
            id: session.id,
            spot_id: session.spot_id,
            vehicle_id: session.vehicle_id,
            user_id: session.user_id,
            reserved_at: session.start_time,
            expires_at: session.end_time.unwrap_or(now),
            status,
            notes: session.notes.clone(),
            spot: None,
            vehicle: None,
            session: Some(session),
        })
    }

    pub fn with_spot(mut self, spot: Option<Spot>) -> Self {
        self.spot = spot;
        self
    }

    pub fn with_vehicle(mut self, vehicle: Option<Vehicle>) -> Self {
        self.vehicle = vehicle;
        self
    }
}

/// Aggregated reservation statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationStats {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
    pub used: u64,
    pub cancelled: u64,
    /// Reservation count per garage name
    pub by_garage: BTreeMap<String, u64>,
    pub average_duration_minutes: f64,
    /// `used / total * 100`
    pub utilization_rate: f64,
}

/// One classified row fed into [`ReservationStats::collect`]
#[derive(Debug, Clone)]
pub struct StatsEntry {
    pub status: ReservationStatus,
    pub garage_name: Option<String>,
    pub duration_minutes: Option<f64>,
}

impl ReservationStats {
    pub fn collect<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = StatsEntry>,
    {
        let mut stats = ReservationStats::default();
        let mut duration_sum = 0.0;
        let mut duration_count = 0u64;

        for entry in entries {
            stats.total += 1;
            match entry.status {
                ReservationStatus::Active => stats.active += 1,
                ReservationStatus::Expired => stats.expired += 1,
                ReservationStatus::Used => stats.used += 1,
                ReservationStatus::Cancelled => stats.cancelled += 1,
            }
            if let Some(name) = entry.garage_name {
                *stats.by_garage.entry(name).or_insert(0) += 1;
            }
            if let Some(minutes) = entry.duration_minutes {
                duration_sum += minutes;
                duration_count += 1;
            }
        }

        if duration_count > 0 {
            stats.average_duration_minutes = duration_sum / duration_count as f64;
        }
        if stats.total > 0 {
            stats.utilization_rate = stats.used as f64 / stats.total as f64 * 100.0;
        }

        stats
    }
}

//! Domain models for parking reservations
//!
//! Spots and vehicles are consumed read-mostly; sessions carry both
//! occupancies and reservations; the reservation view is derived.

pub mod reservation;
pub mod session;
pub mod spot;
pub mod vehicle;

pub use reservation::{
    cancelled_reservation_note, derive_reservation_status, reservation_note,
    used_reservation_note, CreateReservationRequest, ReservationStats, ReservationStatus,
    ReservationView, StatsEntry, EXPIRED_RESERVATION_NOTE,
};
pub use session::{
    KindFilter, NewSession, Session, SessionChanges, SessionFilter, SessionKind, SessionStatus,
};
pub use spot::{Spot, SpotStatus};
pub use vehicle::Vehicle;

//! Repository implementations
//!
//! Each module implements one store trait from parking-core on
//! [`PgParkingTx`](crate::store::PgParkingTx), using sqlx against PostgreSQL.

pub mod session_repo;
pub mod spot_repo;
pub mod vehicle_repo;

//! Reservation engine against PostgreSQL
//!
//! These tests need a reachable database (`DATABASE_URL`) and are ignored by
//! default. Each test seeds its own garage, so they can share one database.

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use parking_core::{
        config::{DatabaseConfig, IsolationLevel, ReservationConfig},
        models::{CreateReservationRequest, ReservationStatus},
        AppError, SystemClock,
    };
    use parking_db::{create_pool, run_migrations, PgParkingStore, PgPool};
    use parking_services::{ConfiguredRateLookup, ReservationEngine};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    type Engine = ReservationEngine<PgParkingStore, ConfiguredRateLookup>;

    async fn engine() -> (PgParkingStore, Arc<Engine>) {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/parking".to_string());

        let config = DatabaseConfig {
            url,
            max_connections: 16,
            min_connections: 1,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 60,
            isolation_level: IsolationLevel::Serializable,
            run_migrations: true,
        };

        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let store = PgParkingStore::new(pool, config.isolation_level);
        let engine = Arc::new(ReservationEngine::new(
            Arc::new(store.clone()),
            Arc::new(ConfiguredRateLookup::new(dec!(5.00))),
            Arc::new(SystemClock),
            ReservationConfig::default(),
        ));

        (store, engine)
    }

    /// Insert a garage with one floor and one available spot; returns the spot id
    async fn seed_spot(pool: &PgPool) -> i32 {
        let name = format!("Test Garage {}", Uuid::new_v4());
        let garage_id: i32 =
            sqlx::query_scalar("INSERT INTO garages (name) VALUES ($1) RETURNING id")
                .bind(&name)
                .fetch_one(pool)
                .await
                .unwrap();
        let floor_id: i32 = sqlx::query_scalar(
            "INSERT INTO floors (garage_id, floor_number) VALUES ($1, 1) RETURNING id",
        )
        .bind(garage_id)
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query_scalar(
            "INSERT INTO parking_spots (floor_id, spot_number, status) \
             VALUES ($1, 'T-01', 'AVAILABLE') RETURNING id",
        )
        .bind(floor_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_vehicles(pool: &PgPool, count: usize) -> Vec<i32> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let plate = format!("T-{}", &Uuid::new_v4().simple().to_string()[..8]);
            let id: i32 = sqlx::query_scalar(
                "INSERT INTO vehicles (license_plate) VALUES ($1) RETURNING id",
            )
            .bind(plate)
            .fetch_one(pool)
            .await
            .unwrap();
            ids.push(id);
        }
        ids
    }

    async fn spot_status(pool: &PgPool, spot_id: i32) -> String {
        sqlx::query_scalar("SELECT status FROM parking_spots WHERE id = $1")
            .bind(spot_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_concurrent_creates_claim_spot_once() {
        const ATTEMPTS: usize = 8;

        let (store, engine) = engine().await;
        let spot_id = seed_spot(store.pool()).await;
        let vehicles = seed_vehicles(store.pool(), ATTEMPTS).await;

        let handles: Vec<_> = vehicles
            .iter()
            .map(|&vehicle_id| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .create_reservation(CreateReservationRequest::new(spot_id, vehicle_id))
                        .await
                })
            })
            .collect();

        let results: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let won = results.iter().filter(|r| r.is_ok()).count();
        let unavailable = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::SpotUnavailable(_))))
            .count();

        assert_eq!(won, 1, "results: {:?}", results);
        assert_eq!(unavailable, ATTEMPTS - 1, "results: {:?}", results);

        assert_eq!(spot_status(store.pool(), spot_id).await, "RESERVED");
        let held = engine.find_by_spot_id(spot_id, None).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].status, ReservationStatus::Active);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_cancel_releases_spot() {
        let (store, engine) = engine().await;
        let spot_id = seed_spot(store.pool()).await;
        let vehicle_id = seed_vehicles(store.pool(), 1).await[0];

        let view = engine
            .create_reservation(CreateReservationRequest::new(spot_id, vehicle_id))
            .await
            .unwrap();
        assert_eq!(spot_status(store.pool(), spot_id).await, "RESERVED");

        let cancelled = engine
            .cancel_reservation(view.id, Some("plans changed".to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(spot_status(store.pool(), spot_id).await, "AVAILABLE");

        assert!(matches!(
            engine.cancel_reservation(view.id, None).await,
            Err(AppError::ReservationNotFound(_))
        ));
    }
}

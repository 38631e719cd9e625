// Live Postgres tests for the reservation protocol. They exercise the real
// transaction semantics (row locking, rollback, rowcount checks) and only run
// when TEST_DATABASE_URL points at a disposable database:
//
//   TEST_DATABASE_URL=postgres://localhost/agenza_test cargo test -p booking-cell

use chrono::{NaiveDate, NaiveTime};
use futures::future::join_all;
use sqlx::PgPool;

use booking_cell::{BookingApi, BookingStore, ReserveSlotRequest};

async fn live_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping live store test (set TEST_DATABASE_URL to enable)");
            return None;
        }
    };

    let pool = shared_database::connect(&url)
        .await
        .expect("failed to connect to test database");
    shared_database::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    Some(pool)
}

async fn seed_doctor(pool: &PgPool, name: &str, specialty: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO doctors (name, specialty) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(specialty)
        .fetch_one(pool)
        .await
        .expect("failed to seed doctor")
}

async fn seed_slot(pool: &PgPool, doctor_id: i64, date: NaiveDate, time: NaiveTime) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO slots (doctor_id, slot_date, start_time) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(doctor_id)
    .bind(date)
    .bind(time)
    .fetch_one(pool)
    .await
    .expect("failed to seed slot")
}

async fn appointment_id_for_slot(pool: &PgPool, slot_id: i64) -> i64 {
    sqlx::query_scalar(
        "SELECT id FROM appointments WHERE slot_id = $1 AND status = 'CONFIRMED'",
    )
    .bind(slot_id)
    .fetch_one(pool)
    .await
    .expect("expected one confirmed appointment")
}

fn reserve_request(slot_id: i64, doctor_id: i64, national_id: &str, name: &str) -> ReserveSlotRequest {
    ReserveSlotRequest {
        slot_id,
        national_id: national_id.to_string(),
        full_name: name.to_string(),
        phone: "+56911111111".to_string(),
        doctor_id,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).unwrap()
}

#[tokio::test]
async fn concurrent_reservations_admit_exactly_one_winner() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dra. Rojas", "Dermatología").await;
    let slot_id = seed_slot(&pool, doctor_id, date(2025, 11, 6), time(10, 0)).await;

    let attempts = (0..8).map(|i| {
        let store = store.clone();
        let request = reserve_request(slot_id, doctor_id, &format!("2000000{}-1", i), "Paciente Concurrente");
        async move { store.reserve_slot(request).await }
    });

    let results = join_all(attempts).await;
    let winners = results.iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one concurrent caller may win the slot");

    let confirmed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE slot_id = $1 AND status = 'CONFIRMED'",
    )
    .bind(slot_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(confirmed, 1);
}

#[tokio::test]
async fn cancellation_restores_the_pre_reservation_slot_state() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dr. Soto", "Medicina General").await;
    let slot_id = seed_slot(&pool, doctor_id, date(2025, 11, 7), time(11, 0)).await;

    assert!(
        store
            .reserve_slot(reserve_request(slot_id, doctor_id, "21000001-1", "Ana Pérez"))
            .await
    );
    let appointment_id = appointment_id_for_slot(&pool, slot_id).await;

    assert!(store.cancel_appointment(appointment_id, slot_id).await);

    let (status, patient_id): (String, Option<i64>) = sqlx::query_as(
        "SELECT status::text, patient_id FROM slots WHERE id = $1",
    )
    .bind(slot_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "AVAILABLE");
    assert_eq!(patient_id, None);
}

#[tokio::test]
async fn double_cancellation_fails_cleanly_without_refreeing_the_slot() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dr. Muñoz", "Traumatología").await;
    let slot_id = seed_slot(&pool, doctor_id, date(2025, 11, 8), time(9, 0)).await;

    assert!(
        store
            .reserve_slot(reserve_request(slot_id, doctor_id, "21000002-1", "Ana Pérez"))
            .await
    );
    let appointment_id = appointment_id_for_slot(&pool, slot_id).await;

    assert!(store.cancel_appointment(appointment_id, slot_id).await);

    // The freed slot goes to a new patient before the duplicate cancel lands.
    assert!(
        store
            .reserve_slot(reserve_request(slot_id, doctor_id, "21000003-1", "Berta Díaz"))
            .await
    );

    assert!(
        !store.cancel_appointment(appointment_id, slot_id).await,
        "second cancellation of the same appointment must fail"
    );

    let status: String = sqlx::query_scalar("SELECT status::text FROM slots WHERE id = $1")
        .bind(slot_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "RESERVED", "the new reservation must survive the stale cancel");
}

#[tokio::test]
async fn patient_upsert_keeps_the_latest_name_and_phone() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dra. Fuentes", "Pediatría").await;
    let first = seed_slot(&pool, doctor_id, date(2025, 11, 10), time(10, 0)).await;
    let second = seed_slot(&pool, doctor_id, date(2025, 11, 10), time(11, 0)).await;

    assert!(
        store
            .reserve_slot(reserve_request(first, doctor_id, "21000004-1", "Ana Perez"))
            .await
    );
    assert!(
        store
            .reserve_slot(reserve_request(second, doctor_id, "21000004-1", "Ana Pérez Soto"))
            .await
    );

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE national_id = '21000004-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1, "re-booking must not duplicate the patient");

    let name: String =
        sqlx::query_scalar("SELECT full_name FROM patients WHERE national_id = '21000004-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(name, "Ana Pérez Soto");
}

#[tokio::test]
async fn reserved_slot_disappears_from_availability() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dr. Ibáñez", "Oftalmología").await;
    let day = date(2025, 11, 6);
    let ten = seed_slot(&pool, doctor_id, day, time(10, 0)).await;
    let eleven = seed_slot(&pool, doctor_id, day, time(11, 0)).await;

    assert!(
        store
            .reserve_slot(reserve_request(ten, doctor_id, "11111111-1", "Ana Pérez"))
            .await
    );
    assert!(
        !store
            .reserve_slot(reserve_request(ten, doctor_id, "22222222-2", "Berta Díaz"))
            .await,
        "a second reservation of the same slot must fail"
    );

    let open = store.list_available_slots(doctor_id, day).await;
    let open_ids: Vec<i64> = open.iter().map(|s| s.id).collect();
    assert!(!open_ids.contains(&ten));
    assert!(open_ids.contains(&eleven));
}

#[tokio::test]
async fn upcoming_confirmed_excludes_cancelled_and_other_dates() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dra. Vidal", "Cardiología").await;
    let target = date(2025, 11, 12);

    let kept = seed_slot(&pool, doctor_id, target, time(10, 0)).await;
    let dropped = seed_slot(&pool, doctor_id, target, time(11, 0)).await;
    let other_day = seed_slot(&pool, doctor_id, date(2025, 11, 13), time(10, 0)).await;

    assert!(
        store
            .reserve_slot(reserve_request(kept, doctor_id, "21000005-1", "Carla Reyes"))
            .await
    );
    assert!(
        store
            .reserve_slot(reserve_request(dropped, doctor_id, "21000006-1", "Diego Lagos"))
            .await
    );
    assert!(
        store
            .reserve_slot(reserve_request(other_day, doctor_id, "21000007-1", "Elisa Bravo"))
            .await
    );

    let cancelled_appointment = appointment_id_for_slot(&pool, dropped).await;
    assert!(store.cancel_appointment(cancelled_appointment, dropped).await);

    let reminders = store.list_upcoming_confirmed(target).await;
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].patient_name, "Carla Reyes");
    assert_eq!(reminders[0].doctor_name, "Dra. Vidal");
    assert_eq!(reminders[0].slot_date, target);
}

#[tokio::test]
async fn doctors_are_ordered_by_specialty_then_name() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    seed_doctor(&pool, "Dr. Zúñiga", "Anestesiología").await;
    seed_doctor(&pool, "Dra. Aguilera", "Anestesiología").await;

    let doctors = store.list_doctors().await;
    let anesthesia: Vec<&str> = doctors
        .iter()
        .filter(|d| d.specialty == "Anestesiología")
        .map(|d| d.name.as_str())
        .collect();

    let zuniga = anesthesia.iter().position(|n| *n == "Dr. Zúñiga").unwrap();
    let aguilera = anesthesia.iter().position(|n| *n == "Dra. Aguilera").unwrap();
    assert!(aguilera < zuniga, "same specialty must be ordered by name");
}

#[tokio::test]
async fn pending_lookup_returns_only_live_future_appointments() {
    let Some(pool) = live_pool().await else { return };
    let store = BookingStore::new(pool.clone());

    let doctor_id = seed_doctor(&pool, "Dr. Paredes", "Neurología").await;
    let future = chrono::Local::now().date_naive() + chrono::Duration::days(30);

    let kept = seed_slot(&pool, doctor_id, future, time(10, 0)).await;
    let cancelled = seed_slot(&pool, doctor_id, future, time(11, 0)).await;

    assert!(
        store
            .reserve_slot(reserve_request(kept, doctor_id, "21000008-1", "Fabián Lara"))
            .await
    );
    assert!(
        store
            .reserve_slot(reserve_request(cancelled, doctor_id, "21000008-1", "Fabián Lara"))
            .await
    );

    let appointment_id = appointment_id_for_slot(&pool, cancelled).await;
    assert!(store.cancel_appointment(appointment_id, cancelled).await);

    let pending = store.list_pending_by_patient("21000008-1").await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].slot_id, kept);
    assert_eq!(pending[0].doctor_name, "Dr. Paredes");
    assert_eq!(pending[0].slot_date, future);

    assert!(store.list_pending_by_patient("99999999-9").await.is_empty());
}

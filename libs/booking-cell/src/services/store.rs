use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::models::{
    AppointmentStatus, AvailableSlot, Doctor, PendingAppointment, ReminderEntry,
    ReserveSlotRequest, SlotStatus,
};

/// The Booking Store's public contract: plain value parameters in, plain value
/// results out. Storage faults never escape — they are logged here and
/// collapsed to `false` or an empty list, so callers can translate results
/// straight into user-facing messages.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn list_doctors(&self) -> Vec<Doctor>;
    async fn list_available_slots(&self, doctor_id: i64, date: NaiveDate) -> Vec<AvailableSlot>;
    async fn reserve_slot(&self, request: ReserveSlotRequest) -> bool;
    async fn cancel_appointment(&self, appointment_id: i64, slot_id: i64) -> bool;
    async fn list_upcoming_confirmed(&self, for_date: NaiveDate) -> Vec<ReminderEntry>;
    async fn list_pending_by_patient(&self, national_id: &str) -> Vec<PendingAppointment>;
}

#[derive(Clone)]
pub struct BookingStore {
    pool: PgPool,
}

impl BookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, sqlx::Error> {
        sqlx::query_as::<_, Doctor>(
            "SELECT id, name, specialty FROM doctors ORDER BY specialty, name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn fetch_available_slots(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<AvailableSlot>, sqlx::Error> {
        sqlx::query_as::<_, AvailableSlot>(
            "SELECT id, start_time FROM slots \
             WHERE doctor_id = $1 AND slot_date = $2 AND status = $3 \
             ORDER BY start_time ASC",
        )
        .bind(doctor_id)
        .bind(date)
        .bind(SlotStatus::Available)
        .fetch_all(&self.pool)
        .await
    }

    /// The reservation transaction. Three steps, all-or-nothing:
    ///
    /// 1. Upsert the patient by national id (last write wins on name/phone).
    /// 2. Claim the slot with a conditional update — the optimistic lock. The
    ///    `status = 'AVAILABLE'` guard makes the check-then-act a single
    ///    write; under concurrent attempts Postgres serializes on the row
    ///    lock and exactly one update reports an affected row.
    /// 3. Record the CONFIRMED appointment.
    ///
    /// `Ok(false)` means the slot was already claimed; the rollback also
    /// undoes the patient upsert from step 1.
    async fn try_reserve_slot(&self, request: &ReserveSlotRequest) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let patient_id: i64 = sqlx::query_scalar(
            "INSERT INTO patients (national_id, full_name, phone) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (national_id) DO UPDATE \
             SET full_name = EXCLUDED.full_name, phone = EXCLUDED.phone \
             RETURNING id",
        )
        .bind(&request.national_id)
        .bind(&request.full_name)
        .bind(&request.phone)
        .fetch_one(&mut *tx)
        .await?;

        let claimed = sqlx::query(
            "UPDATE slots SET status = $1, patient_id = $2 \
             WHERE id = $3 AND status = $4",
        )
        .bind(SlotStatus::Reserved)
        .bind(patient_id)
        .bind(request.slot_id)
        .bind(SlotStatus::Available)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO appointments (slot_id, patient_id, doctor_id, status) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(request.slot_id)
        .bind(patient_id)
        .bind(request.doctor_id)
        .bind(AppointmentStatus::Confirmed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Cancellation transaction. The conditional appointment update proves
    /// the appointment was still live, which makes the second call with the
    /// same id fail cleanly instead of double-freeing a slot another patient
    /// may have since booked.
    async fn try_cancel_appointment(
        &self,
        appointment_id: i64,
        slot_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query(
            "UPDATE appointments SET status = $1 WHERE id = $2 AND status = $3",
        )
        .bind(AppointmentStatus::Cancelled)
        .bind(appointment_id)
        .bind(AppointmentStatus::Confirmed)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if cancelled == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE slots SET status = $1, patient_id = NULL WHERE id = $2")
            .bind(SlotStatus::Available)
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn fetch_upcoming_confirmed(
        &self,
        for_date: NaiveDate,
    ) -> Result<Vec<ReminderEntry>, sqlx::Error> {
        sqlx::query_as::<_, ReminderEntry>(
            "SELECT p.full_name AS patient_name, p.phone AS patient_phone, \
                    d.name AS doctor_name, s.slot_date, s.start_time \
             FROM appointments a \
             JOIN slots s ON s.id = a.slot_id \
             JOIN doctors d ON d.id = a.doctor_id \
             JOIN patients p ON p.id = a.patient_id \
             WHERE s.slot_date = $1 AND a.status = $2 \
             ORDER BY s.slot_date, s.start_time",
        )
        .bind(for_date)
        .bind(AppointmentStatus::Confirmed)
        .fetch_all(&self.pool)
        .await
    }

    async fn fetch_pending_by_patient(
        &self,
        national_id: &str,
    ) -> Result<Vec<PendingAppointment>, sqlx::Error> {
        sqlx::query_as::<_, PendingAppointment>(
            "SELECT a.id AS appointment_id, s.id AS slot_id, \
                    d.name AS doctor_name, s.slot_date, s.start_time \
             FROM appointments a \
             JOIN slots s ON s.id = a.slot_id \
             JOIN doctors d ON d.id = a.doctor_id \
             JOIN patients p ON p.id = a.patient_id \
             WHERE p.national_id = $1 AND a.status = $2 AND s.slot_date >= CURRENT_DATE \
             ORDER BY s.slot_date, s.start_time",
        )
        .bind(national_id)
        .bind(AppointmentStatus::Confirmed)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl BookingApi for BookingStore {
    async fn list_doctors(&self) -> Vec<Doctor> {
        match self.fetch_doctors().await {
            Ok(doctors) => doctors,
            Err(e) => {
                error!("list_doctors failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn list_available_slots(&self, doctor_id: i64, date: NaiveDate) -> Vec<AvailableSlot> {
        match self.fetch_available_slots(doctor_id, date).await {
            Ok(slots) => slots,
            Err(e) => {
                error!(
                    "list_available_slots failed for doctor {} on {}: {}",
                    doctor_id, date, e
                );
                Vec::new()
            }
        }
    }

    async fn reserve_slot(&self, request: ReserveSlotRequest) -> bool {
        match self.try_reserve_slot(&request).await {
            Ok(true) => {
                info!(
                    "Reserved slot {} for patient {} with doctor {}",
                    request.slot_id, request.national_id, request.doctor_id
                );
                true
            }
            // Expected under contention: another caller claimed the slot first.
            Ok(false) => {
                debug!("Slot {} no longer available", request.slot_id);
                false
            }
            Err(e) => {
                error!("reserve_slot failed for slot {}: {}", request.slot_id, e);
                false
            }
        }
    }

    async fn cancel_appointment(&self, appointment_id: i64, slot_id: i64) -> bool {
        match self.try_cancel_appointment(appointment_id, slot_id).await {
            Ok(true) => {
                info!("Cancelled appointment {} and freed slot {}", appointment_id, slot_id);
                true
            }
            Ok(false) => {
                debug!("Appointment {} not cancellable (unknown or already cancelled)", appointment_id);
                false
            }
            Err(e) => {
                error!("cancel_appointment failed for appointment {}: {}", appointment_id, e);
                false
            }
        }
    }

    async fn list_upcoming_confirmed(&self, for_date: NaiveDate) -> Vec<ReminderEntry> {
        match self.fetch_upcoming_confirmed(for_date).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("list_upcoming_confirmed failed for {}: {}", for_date, e);
                Vec::new()
            }
        }
    }

    async fn list_pending_by_patient(&self, national_id: &str) -> Vec<PendingAppointment> {
        match self.fetch_pending_by_patient(national_id).await {
            Ok(pending) => pending,
            Err(e) => {
                error!("list_pending_by_patient failed for {}: {}", national_id, e);
                Vec::new()
            }
        }
    }
}

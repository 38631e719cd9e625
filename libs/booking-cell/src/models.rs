use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialty: String,
}

/// One bookable time unit for one doctor on one date, as shown in the
/// availability menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvailableSlot {
    pub id: i64,
    pub start_time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "slot_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SlotStatus {
    Available,
    Reserved,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "AVAILABLE"),
            SlotStatus::Reserved => write!(f, "RESERVED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==============================================================================
// REQUEST/RESULT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReserveSlotRequest {
    pub slot_id: i64,
    pub national_id: String,
    pub full_name: String,
    pub phone: String,
    pub doctor_id: i64,
}

/// Row handed to the reminder job: everything needed to format and address
/// one next-day reminder.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReminderEntry {
    pub patient_name: String,
    pub patient_phone: String,
    pub doctor_name: String,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
}

/// A patient's live appointment, as listed in the cancellation menu.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PendingAppointment {
    pub appointment_id: i64,
    pub slot_id: i64,
    pub doctor_name: String,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
}

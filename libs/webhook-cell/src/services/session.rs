use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;

use booking_cell::{AvailableSlot, Doctor, PendingAppointment};

const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Where a conversation stands. Menu states carry the options that were
/// offered, so a "2" reply resolves against what the user actually saw and
/// database ids never travel over WhatsApp.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConversationState {
    #[default]
    Start,
    ChoosingDoctor {
        doctors: Vec<Doctor>,
    },
    ChoosingDate {
        doctor: Doctor,
    },
    ChoosingSlot {
        doctor: Doctor,
        date: NaiveDate,
        slots: Vec<AvailableSlot>,
    },
    AwaitingNationalId {
        doctor: Doctor,
        date: NaiveDate,
        slot: AvailableSlot,
    },
    AwaitingName {
        doctor: Doctor,
        date: NaiveDate,
        slot: AvailableSlot,
        national_id: String,
    },
    CancelAwaitingNationalId,
    CancelChoosingAppointment {
        pending: Vec<PendingAppointment>,
    },
}

struct Session {
    state: ConversationState,
    updated_at: Instant,
}

/// In-process conversation map keyed by phone number. Volatile by design:
/// sessions die with the process, and horizontal scaling requires swapping
/// this for an external keyed store (see DESIGN.md).
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Current state for a phone number; an expired or missing session is a
    /// fresh `Start`.
    pub fn get(&self, phone: &str) -> ConversationState {
        if let Some(entry) = self.sessions.get(phone) {
            if entry.updated_at.elapsed() < self.ttl {
                return entry.state.clone();
            }
        }
        self.sessions.remove(phone);
        ConversationState::Start
    }

    pub fn set(&self, phone: &str, state: ConversationState) {
        // A conversation back at Start carries nothing worth keeping.
        if state == ConversationState::Start {
            self.sessions.remove(phone);
            return;
        }
        self.sessions.insert(
            phone.to_string(),
            Session {
                state,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

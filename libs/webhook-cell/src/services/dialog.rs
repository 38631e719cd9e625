use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use booking_cell::{AvailableSlot, BookingApi, Doctor, PendingAppointment, ReserveSlotRequest};

use crate::services::session::ConversationState;

/// Conversation state machine. Takes the sender's current state and message
/// text, runs at most one booking-store operation, and returns the next state
/// plus the replies to send. It never sends anything itself, so no store
/// transaction is ever held open across an outbound network call.
#[derive(Clone)]
pub struct DialogService {
    booking: Arc<dyn BookingApi>,
}

impl DialogService {
    pub fn new(booking: Arc<dyn BookingApi>) -> Self {
        Self { booking }
    }

    pub async fn handle_message(
        &self,
        state: ConversationState,
        text: &str,
        sender: &str,
    ) -> (ConversationState, Vec<String>) {
        let input = text.trim();
        debug!("Dialog step for {}", sender);

        match state {
            ConversationState::Start => self.handle_start(input).await,
            ConversationState::ChoosingDoctor { doctors } => {
                self.handle_doctor_choice(doctors, input)
            }
            ConversationState::ChoosingDate { doctor } => {
                self.handle_date_choice(doctor, input).await
            }
            ConversationState::ChoosingSlot { doctor, date, slots } => {
                self.handle_slot_choice(doctor, date, slots, input)
            }
            ConversationState::AwaitingNationalId { doctor, date, slot } => {
                self.handle_national_id(doctor, date, slot, input)
            }
            ConversationState::AwaitingName { doctor, date, slot, national_id } => {
                self.handle_name(doctor, date, slot, national_id, input, sender)
                    .await
            }
            ConversationState::CancelAwaitingNationalId => {
                self.handle_cancel_national_id(input).await
            }
            ConversationState::CancelChoosingAppointment { pending } => {
                self.handle_cancel_choice(pending, input).await
            }
        }
    }

    async fn handle_start(&self, input: &str) -> (ConversationState, Vec<String>) {
        let lowered = input.to_lowercase();

        if lowered.contains("agendar") || lowered.contains("hora") {
            let doctors = self.booking.list_doctors().await;
            if doctors.is_empty() {
                return (
                    ConversationState::Start,
                    vec![
                        "Por el momento no tenemos médicos disponibles para agendar. \
                         Inténtalo de nuevo más tarde."
                            .to_string(),
                    ],
                );
            }
            let menu = format!(
                "¡Hola! 👋 Estos son nuestros médicos:\n{}\n\nResponde con el número del médico.",
                doctor_menu(&doctors)
            );
            return (ConversationState::ChoosingDoctor { doctors }, vec![menu]);
        }

        if lowered.contains("cancelar") {
            return (
                ConversationState::CancelAwaitingNationalId,
                vec![
                    "Para cancelar una cita, envíame tu RUT (por ejemplo 11111111-1)."
                        .to_string(),
                ],
            );
        }

        (
            ConversationState::Start,
            vec![
                "¡Hola! 👋 Soy el asistente de agenda de la clínica.\n\
                 Escribe *agendar* para reservar una hora o *cancelar* para anular una cita."
                    .to_string(),
            ],
        )
    }

    fn handle_doctor_choice(
        &self,
        doctors: Vec<Doctor>,
        input: &str,
    ) -> (ConversationState, Vec<String>) {
        match parse_menu_choice(input, doctors.len()) {
            Some(index) => {
                let doctor = doctors[index].clone();
                let reply = format!(
                    "Has elegido a {} ({}).\n¿Para qué fecha buscas hora? (DD-MM-AAAA)",
                    doctor.name, doctor.specialty
                );
                (ConversationState::ChoosingDate { doctor }, vec![reply])
            }
            None => (
                ConversationState::ChoosingDoctor { doctors },
                vec!["No entendí tu respuesta. Envía solo el número del médico.".to_string()],
            ),
        }
    }

    async fn handle_date_choice(
        &self,
        doctor: Doctor,
        input: &str,
    ) -> (ConversationState, Vec<String>) {
        let Some(date) = parse_date(input) else {
            return (
                ConversationState::ChoosingDate { doctor },
                vec!["No entendí la fecha. Usa el formato DD-MM-AAAA, por ejemplo 06-11-2025."
                    .to_string()],
            );
        };

        let slots = self.booking.list_available_slots(doctor.id, date).await;
        if slots.is_empty() {
            return (
                ConversationState::ChoosingDate { doctor },
                vec![format!(
                    "No hay horas disponibles para el {}. Prueba con otra fecha (DD-MM-AAAA).",
                    format_date(date)
                )],
            );
        }

        let menu = format!(
            "Horas disponibles el {}:\n{}\n\nResponde con el número de la hora.",
            format_date(date),
            slot_menu(&slots)
        );
        (
            ConversationState::ChoosingSlot { doctor, date, slots },
            vec![menu],
        )
    }

    fn handle_slot_choice(
        &self,
        doctor: Doctor,
        date: NaiveDate,
        slots: Vec<AvailableSlot>,
        input: &str,
    ) -> (ConversationState, Vec<String>) {
        match parse_menu_choice(input, slots.len()) {
            Some(index) => {
                let slot = slots[index].clone();
                let reply = format!(
                    "Perfecto: {} el {} a las {}.\nEnvíame tu RUT para confirmar la reserva.",
                    doctor.name,
                    format_date(date),
                    format_time(slot.start_time)
                );
                (
                    ConversationState::AwaitingNationalId { doctor, date, slot },
                    vec![reply],
                )
            }
            None => (
                ConversationState::ChoosingSlot { doctor, date, slots },
                vec!["No entendí tu respuesta. Envía solo el número de la hora.".to_string()],
            ),
        }
    }

    fn handle_national_id(
        &self,
        doctor: Doctor,
        date: NaiveDate,
        slot: AvailableSlot,
        input: &str,
    ) -> (ConversationState, Vec<String>) {
        match normalize_national_id(input) {
            Some(national_id) => (
                ConversationState::AwaitingName {
                    doctor,
                    date,
                    slot,
                    national_id,
                },
                vec!["Gracias. ¿A nombre de quién registramos la hora? (nombre y apellido)"
                    .to_string()],
            ),
            None => (
                ConversationState::AwaitingNationalId { doctor, date, slot },
                vec!["Ese RUT no parece válido. Envíalo como 11111111-1.".to_string()],
            ),
        }
    }

    async fn handle_name(
        &self,
        doctor: Doctor,
        date: NaiveDate,
        slot: AvailableSlot,
        national_id: String,
        input: &str,
        sender: &str,
    ) -> (ConversationState, Vec<String>) {
        let full_name = input.trim();
        if full_name.len() < 3 {
            return (
                ConversationState::AwaitingName {
                    doctor,
                    date,
                    slot,
                    national_id,
                },
                vec!["Necesito el nombre completo del paciente (nombre y apellido).".to_string()],
            );
        }

        let reserved = self
            .booking
            .reserve_slot(ReserveSlotRequest {
                slot_id: slot.id,
                national_id: national_id.clone(),
                full_name: full_name.to_string(),
                phone: sender.to_string(),
                doctor_id: doctor.id,
            })
            .await;

        if reserved {
            return (
                ConversationState::Start,
                vec![format!(
                    "✅ ¡Listo, {}! Tu hora con {} quedó agendada para el {} a las {}.\n\
                     Te enviaremos un recordatorio el día anterior.",
                    full_name,
                    doctor.name,
                    format_date(date),
                    format_time(slot.start_time)
                )],
            );
        }

        // Someone else won the slot. Offer whatever is left for that date.
        let remaining = self.booking.list_available_slots(doctor.id, date).await;
        if remaining.is_empty() {
            return (
                ConversationState::Start,
                vec![format!(
                    "😔 Esa hora acaba de ser tomada y no quedan horas el {}.\n\
                     Escribe *agendar* para buscar otra fecha.",
                    format_date(date)
                )],
            );
        }

        let menu = format!(
            "😔 Esa hora acaba de ser tomada. Estas horas siguen disponibles el {}:\n{}\n\n\
             Responde con el número de la hora.",
            format_date(date),
            slot_menu(&remaining)
        );
        (
            ConversationState::ChoosingSlot {
                doctor,
                date,
                slots: remaining,
            },
            vec![menu],
        )
    }

    async fn handle_cancel_national_id(&self, input: &str) -> (ConversationState, Vec<String>) {
        let Some(national_id) = normalize_national_id(input) else {
            return (
                ConversationState::CancelAwaitingNationalId,
                vec!["Ese RUT no parece válido. Envíalo como 11111111-1.".to_string()],
            );
        };

        let pending = self.booking.list_pending_by_patient(&national_id).await;
        if pending.is_empty() {
            return (
                ConversationState::Start,
                vec![
                    "No encontré citas vigentes asociadas a ese RUT. \
                     Escribe *agendar* si quieres reservar una hora."
                        .to_string(),
                ],
            );
        }

        let menu = format!(
            "Tus citas vigentes:\n{}\n\nResponde con el número de la cita que quieres cancelar.",
            pending_menu(&pending)
        );
        (
            ConversationState::CancelChoosingAppointment { pending },
            vec![menu],
        )
    }

    async fn handle_cancel_choice(
        &self,
        pending: Vec<PendingAppointment>,
        input: &str,
    ) -> (ConversationState, Vec<String>) {
        let Some(index) = parse_menu_choice(input, pending.len()) else {
            return (
                ConversationState::CancelChoosingAppointment { pending },
                vec!["No entendí tu respuesta. Envía solo el número de la cita.".to_string()],
            );
        };

        let appointment = &pending[index];
        let cancelled = self
            .booking
            .cancel_appointment(appointment.appointment_id, appointment.slot_id)
            .await;

        let reply = if cancelled {
            format!(
                "✅ Tu cita con {} del {} a las {} fue cancelada.",
                appointment.doctor_name,
                format_date(appointment.slot_date),
                format_time(appointment.start_time)
            )
        } else {
            "No pude cancelar esa cita; puede que ya esté cancelada. \
             Escribe *cancelar* para revisar tus citas vigentes."
                .to_string()
        };

        (ConversationState::Start, vec![reply])
    }
}

// ==============================================================================
// PURE PARSING AND FORMATTING HELPERS
// ==============================================================================

/// 1-based menu selection against `max` offered options.
pub fn parse_menu_choice(input: &str, max: usize) -> Option<usize> {
    let choice: usize = input.trim().trim_end_matches('.').parse().ok()?;
    if choice >= 1 && choice <= max {
        Some(choice - 1)
    } else {
        None
    }
}

/// Accepts the local DD-MM-YYYY convention and ISO YYYY-MM-DD.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    for format in ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}

/// Normalizes a Chilean RUT: strips dots and spaces, uppercases the check
/// digit, and requires the NNNNNNNN-V shape. No checksum validation — the
/// clinic staff reconcile identities, the bot only needs a stable key.
pub fn normalize_national_id(input: &str) -> Option<String> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != ' ')
        .collect::<String>()
        .to_uppercase();

    let (digits, check) = cleaned.split_once('-')?;
    if digits.len() < 7 || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if check.len() != 1 || !check.chars().all(|c| c.is_ascii_digit() || c == 'K') {
        return None;
    }

    Some(cleaned)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn doctor_menu(doctors: &[Doctor]) -> String {
    doctors
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {} — {}", i + 1, d.name, d.specialty))
        .collect::<Vec<_>>()
        .join("\n")
}

fn slot_menu(slots: &[AvailableSlot]) -> String {
    slots
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, format_time(s.start_time)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pending_menu(pending: &[PendingAppointment]) -> String {
    pending
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. {} — {} a las {}",
                i + 1,
                p.doctor_name,
                format_date(p.slot_date),
                format_time(p.start_time)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

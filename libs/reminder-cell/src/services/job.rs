use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use tracing::{info, warn};

use booking_cell::{BookingApi, ReminderEntry};
use messaging_cell::{MessageSender, TemplateParam};

use crate::models::ReminderRunSummary;

const REMINDER_TEMPLATE: &str = "agenza_recordatorio";

/// Next-day reminder job. Invoked once per day by cron through the
/// `agenza-reminder` binary; each invocation is a short-lived unit of work.
pub struct ReminderJob {
    booking: Arc<dyn BookingApi>,
    sender: Arc<dyn MessageSender>,
}

impl ReminderJob {
    pub fn new(booking: Arc<dyn BookingApi>, sender: Arc<dyn MessageSender>) -> Self {
        Self { booking, sender }
    }

    pub async fn run(&self) -> ReminderRunSummary {
        let tomorrow = Local::now().date_naive() + Duration::days(1);
        self.run_for_date(tomorrow).await
    }

    /// One send per confirmed appointment on `for_date`. A failed send is
    /// logged and counted but never aborts the rest of the batch.
    pub async fn run_for_date(&self, for_date: NaiveDate) -> ReminderRunSummary {
        info!("Looking up confirmed appointments for {}", for_date);

        let appointments = self.booking.list_upcoming_confirmed(for_date).await;
        if appointments.is_empty() {
            info!("No appointments for {}, nothing to send", for_date);
            return ReminderRunSummary::default();
        }

        info!("Sending {} reminders for {}", appointments.len(), for_date);

        let mut summary = ReminderRunSummary {
            found: appointments.len(),
            ..Default::default()
        };

        for entry in &appointments {
            match self
                .sender
                .send_template(&entry.patient_phone, REMINDER_TEMPLATE, &template_params(entry))
                .await
            {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    warn!("Reminder to {} failed: {}", entry.patient_phone, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Reminder run finished: {} found, {} sent, {} failed",
            summary.found, summary.sent, summary.failed
        );
        summary
    }
}

fn template_params(entry: &ReminderEntry) -> Vec<TemplateParam> {
    vec![
        TemplateParam::new("1", entry.patient_name.as_str()),
        TemplateParam::new("2", entry.doctor_name.as_str()),
        TemplateParam::new("3", entry.slot_date.format("%d-%m-%Y").to_string()),
        TemplateParam::new("4", entry.start_time.format("%H:%M").to_string()),
    ]
}

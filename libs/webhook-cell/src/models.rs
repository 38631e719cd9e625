use std::sync::Arc;

use serde::Deserialize;

use booking_cell::BookingApi;
use messaging_cell::MessageSender;
use shared_config::AppConfig;

use crate::services::dialog::DialogService;
use crate::services::session::SessionStore;

/// Shared state for the webhook surface. The booking store and the outbound
/// sender sit behind their traits so handlers can be exercised without a
/// database or a live WATI account.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub dialog: DialogService,
    pub sender: Arc<dyn MessageSender>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        booking: Arc<dyn BookingApi>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            config,
            sessions: Arc::new(SessionStore::default()),
            dialog: DialogService::new(booking),
            sender,
        }
    }
}

// ==============================================================================
// INBOUND WEBHOOK PAYLOADS
// ==============================================================================

/// Provider verification handshake query (`GET /webhook`).
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Raw WATI inbound event. Only text messages carry the fields we need;
/// everything else (delivery receipts, media, reactions) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WatiInboundEvent {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[serde(rename = "waId")]
    pub wa_id: Option<String>,
    pub text: Option<String>,
}

/// A normalized inbound message: who sent it and what they typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
}

pub fn extract_message_info(event: &WatiInboundEvent) -> Option<InboundMessage> {
    if event.event_type.as_deref() != Some("text") {
        return None;
    }

    let wa_id = event.wa_id.as_deref()?;
    if wa_id.is_empty() {
        return None;
    }

    let text = event.text.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some(InboundMessage {
        sender: format!("+{}", wa_id),
        text,
    })
}

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::AppState;
pub use services::dialog::DialogService;
pub use services::session::{ConversationState, SessionStore};

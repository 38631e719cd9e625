pub mod models;
pub mod services;

pub use models::{TemplateParam, WatiError};
pub use services::wati::{MessageSender, WatiClient};

pub mod models;
pub mod services;

pub use models::ReminderRunSummary;
pub use services::job::ReminderJob;

use serde::Serialize;

/// Outcome of one reminder run, for the job's exit log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunSummary {
    pub found: usize,
    pub sent: usize,
    pub failed: usize,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One `{name, value}` substitution in an approved WATI template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    pub value: String,
}

impl TemplateParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WatiError {
    #[error("WATI credentials not configured")]
    NotConfigured,

    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WATI API error ({status}): {body}")]
    Api { status: u16, body: String },
}

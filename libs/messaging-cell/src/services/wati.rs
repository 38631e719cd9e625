use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{TemplateParam, WatiError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can deliver an outbound WhatsApp message. The dialog and the
/// reminder job talk to this trait, never to the HTTP client directly.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Free-form text inside an open 24h session window.
    async fn send_text(&self, to: &str, body: &str) -> Result<(), WatiError>;

    /// Pre-approved template, usable outside the session window.
    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        parameters: &[TemplateParam],
    ) -> Result<(), WatiError>;
}

pub struct WatiClient {
    client: Client,
    base_endpoint: String,
    access_token: String,
    account_id: String,
}

impl WatiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_endpoint: config.wati_base_endpoint.trim_end_matches('/').to_string(),
            access_token: config.wati_access_token.clone(),
            account_id: config.wati_account_id.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&self.access_token).unwrap(),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn ensure_configured(&self) -> Result<(), WatiError> {
        if self.base_endpoint.is_empty() || self.access_token.is_empty() || self.account_id.is_empty() {
            return Err(WatiError::NotConfigured);
        }
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<(), WatiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("WATI API error ({}): {}", status, body);
            return Err(WatiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSender for WatiClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), WatiError> {
        self.ensure_configured()?;

        // Session-message API takes the text as a query parameter.
        let url = format!(
            "{}/{}/api/v1/sendSessionMessage/{}?messageText={}",
            self.base_endpoint,
            self.account_id,
            to.trim_start_matches('+'),
            urlencoding::encode(body),
        );
        debug!("Sending session message to {}", to);

        let response = self
            .client
            .post(&url)
            .headers(self.get_headers())
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        parameters: &[TemplateParam],
    ) -> Result<(), WatiError> {
        self.ensure_configured()?;

        let url = format!(
            "{}/{}/api/v2/sendTemplateMessage",
            self.base_endpoint, self.account_id
        );

        let payload = json!({
            "template_name": template_name,
            "broadcast_name": format!("agenza_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            "to": to.trim_start_matches('+'),
            "parameters": parameters,
        });
        debug!("Sending template {} to {}", template_name, to);

        let response = self
            .client
            .post(&url)
            .headers(self.get_headers())
            .json(&payload)
            .send()
            .await?;

        Self::check_status(response).await
    }
}

use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub verify_token: String,
    pub wati_base_endpoint: String,
    pub wati_access_token: String,
    pub wati_account_id: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            verify_token: env::var("VERIFY_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("VERIFY_TOKEN not set, using empty value");
                    String::new()
                }),
            wati_base_endpoint: env::var("WATI_BASE_ENDPOINT")
                .unwrap_or_else(|_| {
                    warn!("WATI_BASE_ENDPOINT not set, using empty value");
                    String::new()
                }),
            wati_access_token: env::var("WATI_ACCESS_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("WATI_ACCESS_TOKEN not set, using empty value");
                    String::new()
                }),
            wati_account_id: env::var("WATI_ACCOUNT_ID")
                .unwrap_or_else(|_| {
                    warn!("WATI_ACCOUNT_ID not set, using empty value");
                    String::new()
                }),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty() && !self.verify_token.is_empty()
    }

    pub fn is_messaging_configured(&self) -> bool {
        !self.wati_base_endpoint.is_empty()
            && !self.wati_access_token.is_empty()
            && !self.wati_account_id.is_empty()
    }
}

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_cell::BookingStore;
use messaging_cell::WatiClient;
use reminder_cell::ReminderJob;
use shared_config::AppConfig;

/// Cron entry point: one short-lived run per invocation, scheduling stays in
/// the crontab.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reminder job");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Reminder job failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    let pool = shared_database::connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let booking = Arc::new(BookingStore::new(pool));
    let sender = Arc::new(WatiClient::new(&config));

    let summary = ReminderJob::new(booking, sender).run().await;
    info!(
        "Reminder job finished: {} found, {} sent, {} failed",
        summary.found, summary.sent, summary.failed
    );

    Ok(())
}

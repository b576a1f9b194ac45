//! Development server for mobile-client development
//!
//! This binary creates a persistent API server against an isolated database
//! with demo data: three users, a shared trip, expenses, and a pending
//! payment. It uses mocked time for the seeded rows, then syncs with real
//! time so clients see sensible timestamps.
//!
//! Usage: cargo run -p dev-server

use anyhow::Result;
use jiff::Timestamp;
use std::time::Duration;
use test_helpers::mock::DevDataset;
use tokio::time::interval;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = api::telemetry::get_subscriber("info".into());
    api::telemetry::init_subscriber(subscriber);

    info!("Starting development server");

    // Spawn the test app with mocked time
    let app = test_helpers::spawn_app().await;

    info!("API server running on http://127.0.0.1:{}", app.port);

    info!("Seeding demo data...");
    let dataset = DevDataset::create(&app).await?;

    // Keep the mocked clock following the wall clock from here on
    start_time_sync_task(&app);

    info!("Development server ready!");
    info!("   API: http://127.0.0.1:{}", app.port);
    info!("");
    dataset.print_summary();
    info!("");
    info!("Press Ctrl+C to shutdown");

    // Keep server running until Ctrl+C
    tokio::signal::ctrl_c().await?;
    info!("Shutting down development server");
    Ok(())
}

/// Continuously sync the mocked time source with real time so newly created
/// rows get current timestamps.
fn start_time_sync_task(app: &test_helpers::TestApp) {
    let time_source = app.time_source.clone();

    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            time_source.set(Timestamp::now());
        }
    });
}

//! hifz-sched - Memorization Scheduling Service
//!
//! The scheduling backend for hifz training: event-sourced item state,
//! spaced-repetition planning, the daily today-queue and the 3x3 session
//! protocol, served over HTTP.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hifz_sched::config::Config;
use hifz_sched::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting hifz-sched (Memorization Scheduler)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // First CLI argument, if present, overrides the data directory
    let args: Vec<String> = std::env::args().collect();
    let config = Config::load(args.get(1).map(String::as_str))?;
    info!("Database: {}", config.db_path.display());

    let db_pool = hifz_common::db::init_database(&config.db_path).await?;
    info!("Database connection established");

    let state = AppState::new(db_pool);
    let app = build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health/live", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

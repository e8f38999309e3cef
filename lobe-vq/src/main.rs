//! lobe-vq (Verification Queue) - Review scheduling and progression service
//!
//! Serves the reviewer-facing queue: hands out the next session to review,
//! records and retracts verifications, and keeps the per-reviewer
//! progression ledger in sync.

use anyhow::Result;
use clap::Parser;
use lobe_common::db::init_database;
use lobe_common::RewardTable;
use lobe_vq::config::Config;
use lobe_vq::{build_router, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Lobe Verification Queue (lobe-vq) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::parse();

    let pool = init_database(&config.db).await?;
    info!("Database path: {}", config.db.display());

    let rewards = RewardTable::load_or_default(&config.economy)?;

    let state = AppState::new(pool, Arc::new(rewards));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("lobe-vq listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}

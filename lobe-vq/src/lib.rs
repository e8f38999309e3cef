//! lobe-vq library - Verification Queue module
//!
//! Hands out unverified recording sessions to reviewers across the priority
//! lane and the two review passes, and maintains the per-reviewer
//! progression ledger whose mutations are exactly reversed when a review is
//! retracted.

use axum::Router;
use lobe_common::RewardTable;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod pagination;
pub mod review;

use review::lifecycle::VerificationLifecycle;
use review::scheduler::QueueScheduler;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Reward table, loaded once at startup
    pub rewards: Arc<RewardTable>,
    /// Queue scheduler
    pub scheduler: QueueScheduler,
    /// Verification lifecycle
    pub lifecycle: VerificationLifecycle,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, rewards: Arc<RewardTable>) -> Self {
        let scheduler = QueueScheduler::new(db.clone());
        let lifecycle = VerificationLifecycle::new(db.clone(), rewards.clone());
        Self {
            db,
            rewards,
            scheduler,
            lifecycle,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(api::health))
        .route("/api/queue/next", post(api::next_assignment))
        .route(
            "/api/verifications",
            get(api::list_verifications).post(api::create_verification),
        )
        .route("/api/verifications/export", get(api::export_verifications))
        .route(
            "/api/verifications/:id",
            get(api::verification_detail).delete(api::delete_verification),
        )
        .route("/api/reviewers/:id/progress", get(api::reviewer_progress))
        .route("/api/sessions/:id/release", post(api::release_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

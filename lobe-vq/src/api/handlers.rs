//! HTTP request handlers
//!
//! Implements REST API endpoints for the review queue, verification CRUD
//! and the reviewer progress dashboard.

use crate::db;
use crate::review::lifecycle::CreateVerification;
use crate::review::scheduler::Assignment;
use crate::review::{weekly, Pass, QualityFlags, SessionKind, TrimInput};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use lobe_common::db::{TrimRow, VerificationRow};
use lobe_common::economy::Ladder;
use lobe_common::Error;
use serde::{Deserialize, Serialize};
use tracing::error;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct NextAssignmentRequest {
    reviewer_id: i64,
}

#[derive(Debug, Serialize)]
pub struct NextAssignmentResponse {
    /// `null` when there is nothing left to review
    assignment: Option<Assignment>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVerificationRequest {
    recording_id: i64,
    verified_by: i64,
    session_id: i64,
    session_kind: SessionKind,
    pass: Pass,
    #[serde(default)]
    quality: QualityFlags,
    comment: Option<String>,
    #[serde(default)]
    trims: Vec<TrimInput>,
}

#[derive(Debug, Serialize)]
pub struct CreateVerificationResponse {
    id: i64,
    coins: i64,
    experience: i64,
    achievements: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteVerificationResponse {
    coins: i64,
    experience: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct VerificationListResponse {
    page: i64,
    total_pages: i64,
    verifications: Vec<VerificationRow>,
}

#[derive(Debug, Serialize)]
pub struct VerificationDetailResponse {
    verification: VerificationRow,
    trims: Vec<TrimRow>,
}

#[derive(Debug, Serialize)]
pub struct ReviewerProgressResponse {
    user_id: i64,
    coins: i64,
    experience: i64,
    num_verifies: i64,
    num_invalid: i64,
    weekly_verifies: i64,
    verification_level: i64,
    spy_level: i64,
    weekly_total: i64,
    weekly_progress: f64,
    personal_weekly_progress: f64,
    verification_progress: f64,
    spy_progress: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseSessionRequest {
    kind: SessionKind,
}

// ============================================================================
// Error mapping
// ============================================================================

fn error_response(context: &str, e: Error) -> (StatusCode, Json<StatusResponse>) {
    let status = match &e {
        Error::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    // Recoverable errors go back to the caller; everything else needs
    // operator attention.
    if !e.is_recoverable() {
        error!("{}: {}", context, e);
    }
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "lobe-vq".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Queue Endpoints
// ============================================================================

/// POST /api/queue/next - Assign the next session to a reviewer
pub async fn next_assignment(
    State(state): State<AppState>,
    Json(req): Json<NextAssignmentRequest>,
) -> Result<Json<NextAssignmentResponse>, (StatusCode, Json<StatusResponse>)> {
    match state.scheduler.next_assignment(req.reviewer_id).await {
        Ok(assignment) => Ok(Json(NextAssignmentResponse { assignment })),
        Err(e) => Err(error_response("Failed to assign next session", e)),
    }
}

/// POST /api/sessions/:id/release - Administrative assignment reset
pub async fn release_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ReleaseSessionRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    match db::sessions::release_assignment(&state.db, req.kind, id).await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "released".to_string(),
        })),
        Err(e) => Err(error_response("Failed to release session", e)),
    }
}

// ============================================================================
// Verification Endpoints
// ============================================================================

/// POST /api/verifications - Record a verification
pub async fn create_verification(
    State(state): State<AppState>,
    Json(req): Json<CreateVerificationRequest>,
) -> Result<Json<CreateVerificationResponse>, (StatusCode, Json<StatusResponse>)> {
    let create = CreateVerification {
        recording_id: req.recording_id,
        verified_by: req.verified_by,
        session_id: req.session_id,
        session_kind: req.session_kind,
        pass: req.pass,
        quality: req.quality,
        comment: req.comment,
        trims: req.trims,
    };
    match state.lifecycle.create(create).await {
        Ok(outcome) => Ok(Json(CreateVerificationResponse {
            id: outcome.verification_id,
            coins: outcome.coins,
            experience: outcome.experience,
            achievements: outcome.achievements,
        })),
        Err(e) => Err(error_response("Failed to create verification", e)),
    }
}

/// DELETE /api/verifications/:id - Retract a verification
pub async fn delete_verification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteVerificationResponse>, (StatusCode, Json<StatusResponse>)> {
    match state.lifecycle.delete(id).await {
        Ok(outcome) => Ok(Json(DeleteVerificationResponse {
            coins: outcome.coins,
            experience: outcome.experience,
        })),
        Err(e) => Err(error_response("Failed to delete verification", e)),
    }
}

/// GET /api/verifications - Paginated listing, newest first
pub async fn list_verifications(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<VerificationListResponse>, (StatusCode, Json<StatusResponse>)> {
    match db::verifications::list(&state.db, params.page).await {
        Ok((verifications, pagination)) => Ok(Json(VerificationListResponse {
            page: pagination.page,
            total_pages: pagination.total_pages,
            verifications,
        })),
        Err(e) => Err(error_response("Failed to list verifications", e)),
    }
}

/// GET /api/verifications/:id - Single verification with trims
pub async fn verification_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VerificationDetailResponse>, (StatusCode, Json<StatusResponse>)> {
    let verification = match db::verifications::get(&state.db, id).await {
        Ok(v) => v,
        Err(e) => return Err(error_response("Failed to load verification", e)),
    };
    match db::verifications::trims(&state.db, id).await {
        Ok(trims) => Ok(Json(VerificationDetailResponse {
            verification,
            trims,
        })),
        Err(e) => Err(error_response("Failed to load trims", e)),
    }
}

/// GET /api/verifications/export - All verifications as TSV
pub async fn export_verifications(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<StatusResponse>)> {
    match db::verifications::all(&state.db).await {
        Ok(rows) => {
            let body = rows
                .iter()
                .map(VerificationRow::as_tsv_line)
                .collect::<Vec<_>>()
                .join("\n");
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            ))
        }
        Err(e) => Err(error_response("Failed to export verifications", e)),
    }
}

// ============================================================================
// Progress Endpoint
// ============================================================================

/// GET /api/reviewers/:id/progress - Weekly challenge and ladder progress
pub async fn reviewer_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReviewerProgressResponse>, (StatusCode, Json<StatusResponse>)> {
    let progression = match db::progressions::get_or_default(&state.db, id).await {
        Ok(p) => p,
        Err(e) => return Err(error_response("Failed to load progression", e)),
    };
    let weekly_total = match db::progressions::weekly_total(&state.db).await {
        Ok(t) => t,
        Err(e) => return Err(error_response("Failed to sum weekly verifies", e)),
    };

    let challenge = state.rewards.weekly_challenge;
    Ok(Json(ReviewerProgressResponse {
        user_id: progression.user_id,
        coins: progression.lobe_coins,
        experience: progression.experience,
        num_verifies: progression.num_verifies,
        num_invalid: progression.num_invalid,
        weekly_verifies: progression.weekly_verifies,
        verification_level: progression.verification_level,
        spy_level: progression.spy_level,
        weekly_total,
        weekly_progress: weekly::weekly_challenge_progress(
            weekly_total,
            progression.weekly_verifies,
            challenge.goal,
            challenge.extra_interval,
        ),
        personal_weekly_progress: weekly::personal_weekly_progress(
            progression.weekly_verifies,
            challenge.goal,
        ),
        verification_progress: weekly::ladder_progress(
            &progression,
            Ladder::Verification,
            &state.rewards,
        ),
        spy_progress: weekly::ladder_progress(&progression, Ladder::Spy, &state.rewards),
    }))
}

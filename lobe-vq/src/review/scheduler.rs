//! Queue Scheduler
//!
//! Picks the next session a reviewer should review and commits the
//! assignment in the same transaction. Lanes are consulted in order, first
//! non-empty candidate set wins:
//!
//! 1. Priority sessions, primary pass
//! 2. Priority sessions, secondary pass
//! 3. Normal sessions promoted with `has_priority`, primary pass
//! 4. Normal sessions in collections subject to verification, primary pass
//!    (uniform random pick to spread load)
//! 5. Normal sessions, secondary pass
//!
//! Deterministic lanes order by `verified_by` ascending; SQLite sorts NULL
//! first, so unassigned sessions are preferred. Secondary lanes only offer
//! sessions whose primary pass is complete, and never to the reviewer who
//! did the primary pass.
//!
//! An assignment sticks until the session completes or an administrative
//! release clears it; there is no lease expiry.

use crate::review::{Pass, SessionKind};
use lobe_common::{Error, Result};
use rand::Rng;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

/// Reselections attempted after losing an assignment race
const ASSIGN_RETRIES: u32 = 3;

/// A recording still pending review in the assigned session
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingRecording {
    pub recording_id: i64,
    pub token_id: i64,
    pub text: String,
}

/// A session handed to a reviewer for one pass
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub session_id: i64,
    pub session_kind: SessionKind,
    pub pass: Pass,
    pub recordings: Vec<PendingRecording>,
}

/// Queue scheduler over the shared session store
#[derive(Clone)]
pub struct QueueScheduler {
    db: SqlitePool,
}

impl QueueScheduler {
    /// Create new queue scheduler
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Select and assign the next session for a reviewer
    ///
    /// Returns `None` when every lane is empty. A lost race invalidates the
    /// candidate, not the request: selection restarts from scratch so the
    /// reviewer falls through to whatever is still available.
    pub async fn next_assignment(&self, reviewer_id: i64) -> Result<Option<Assignment>> {
        for _ in 0..ASSIGN_RETRIES {
            match self.try_assign(reviewer_id).await {
                Err(Error::Conflict(reason)) => {
                    debug!(reviewer_id, %reason, "assignment race lost, reselecting");
                    continue;
                }
                other => return other,
            }
        }
        Err(Error::Conflict(
            "assignment contention, request the next session again".into(),
        ))
    }

    async fn try_assign(&self, reviewer_id: i64) -> Result<Option<Assignment>> {
        let mut tx = self.db.begin().await?;

        let candidate = self.select_candidate(&mut tx, reviewer_id).await?;
        let (kind, pass, session_id) = match candidate {
            Some(c) => c,
            None => {
                tx.commit().await?;
                return Ok(None);
            }
        };

        assign_slot(&mut tx, kind, pass, session_id, reviewer_id).await?;
        let recordings = pending_recordings(&mut tx, kind, pass, session_id).await?;
        tx.commit().await?;

        debug!(reviewer_id, session_id, ?kind, ?pass, "session assigned");
        Ok(Some(Assignment {
            session_id,
            session_kind: kind,
            pass,
            recordings,
        }))
    }

    async fn select_candidate(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        reviewer_id: i64,
    ) -> Result<Option<(SessionKind, Pass, i64)>> {
        if let Some(id) = priority_primary_candidate(tx, reviewer_id).await? {
            return Ok(Some((SessionKind::Priority, Pass::Primary, id)));
        }
        if let Some(id) = secondary_candidate(tx, SessionKind::Priority, reviewer_id).await? {
            return Ok(Some((SessionKind::Priority, Pass::Secondary, id)));
        }
        if let Some(id) = promoted_primary_candidate(tx, reviewer_id).await? {
            return Ok(Some((SessionKind::Normal, Pass::Primary, id)));
        }
        if let Some(id) = normal_primary_candidate(tx, reviewer_id).await? {
            return Ok(Some((SessionKind::Normal, Pass::Primary, id)));
        }
        if let Some(id) = secondary_candidate(tx, SessionKind::Normal, reviewer_id).await? {
            return Ok(Some((SessionKind::Normal, Pass::Secondary, id)));
        }
        Ok(None)
    }
}

async fn priority_primary_candidate(
    tx: &mut Transaction<'_, Sqlite>,
    reviewer_id: i64,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM priority_sessions
        WHERE is_verified = 0 AND is_dev = 0
          AND (verified_by IS NULL OR verified_by = ?)
        ORDER BY verified_by
        LIMIT 1
        "#,
    )
    .bind(reviewer_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(id)
}

/// Normal sessions promoted into expedited handling
///
/// Picked deterministically like the priority lane; promotion overrides the
/// collection's verification flag.
async fn promoted_primary_candidate(
    tx: &mut Transaction<'_, Sqlite>,
    reviewer_id: i64,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM sessions
        WHERE is_verified = 0 AND is_dev = 0 AND has_priority = 1
          AND (verified_by IS NULL OR verified_by = ?)
        ORDER BY verified_by
        LIMIT 1
        "#,
    )
    .bind(reviewer_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(id)
}

/// Uniform random pick among available normal sessions
///
/// Random rather than oldest-first: with many reviewers pulling at once,
/// spreading them over the candidate set reduces assignment collisions.
async fn normal_primary_candidate(
    tx: &mut Transaction<'_, Sqlite>,
    reviewer_id: i64,
) -> Result<Option<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT s.id FROM sessions s
        JOIN collections c ON s.collection_id = c.id
        WHERE c.is_verify = 1 AND s.is_verified = 0 AND s.is_dev = 0
          AND (s.verified_by IS NULL OR s.verified_by = ?)
        ORDER BY s.id
        "#,
    )
    .bind(reviewer_id)
    .fetch_all(&mut **tx)
    .await?;

    if ids.is_empty() {
        return Ok(None);
    }
    let chosen = ids[rand::thread_rng().gen_range(0..ids.len())];
    Ok(Some(chosen))
}

/// Secondary-pass candidate for either session kind
///
/// The primary pass must be complete and by someone else; the secondary
/// slot must be free or already held by the requester.
async fn secondary_candidate(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SessionKind,
    reviewer_id: i64,
) -> Result<Option<i64>> {
    let sql = format!(
        r#"
        SELECT id FROM {}
        WHERE is_verified = 1 AND is_secondarily_verified = 0 AND is_dev = 0
          AND verified_by IS NOT NULL AND verified_by != ?
          AND (secondarily_verified_by IS NULL OR secondarily_verified_by = ?)
        ORDER BY verified_by
        LIMIT 1
        "#,
        kind.table()
    );
    let id: Option<i64> = sqlx::query_scalar(&sql)
        .bind(reviewer_id)
        .bind(reviewer_id)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(id)
}

/// Commit the assignment, guarded against a concurrent claim
///
/// The slot may have been taken between selection and this update; zero
/// affected rows means the race was lost.
async fn assign_slot(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SessionKind,
    pass: Pass,
    session_id: i64,
    reviewer_id: i64,
) -> Result<()> {
    let column = pass.assignment_column();
    let sql = format!(
        "UPDATE {} SET {} = ? WHERE id = ? AND ({} IS NULL OR {} = ?)",
        kind.table(),
        column,
        column,
        column
    );
    let rows = sqlx::query(&sql)
        .bind(reviewer_id)
        .bind(session_id)
        .bind(reviewer_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(Error::Conflict(format!(
            "{} {} already assigned to another reviewer",
            kind.table(),
            session_id
        )));
    }

    Ok(())
}

/// Recordings of the session still unreviewed for the requested pass
async fn pending_recordings(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SessionKind,
    pass: Pass,
    session_id: i64,
) -> Result<Vec<PendingRecording>> {
    let sql = format!(
        r#"
        SELECT r.id AS recording_id, r.token_id, t.text
        FROM recordings r
        JOIN tokens t ON r.token_id = t.id
        WHERE r.{} = ? AND r.{} = 0
        ORDER BY r.id
        "#,
        kind.recording_fk(),
        pass.flag_column()
    );
    let rows = sqlx::query_as::<_, PendingRecording>(&sql)
        .bind(session_id)
        .fetch_all(&mut **tx)
        .await?;

    Ok(rows)
}

/// Re-run the guarded assignment for a candidate selected earlier
///
/// Exposed for callers that carry a stale candidate across transactions;
/// the normal path goes through [`QueueScheduler::next_assignment`].
pub async fn claim_session(
    db: &SqlitePool,
    kind: SessionKind,
    pass: Pass,
    session_id: i64,
    reviewer_id: i64,
) -> Result<()> {
    let mut tx = db.begin().await?;
    assign_slot(&mut tx, kind, pass, session_id, reviewer_id).await?;
    tx.commit().await?;

    Ok(())
}

//! Verification Lifecycle
//!
//! Creates and deletes verification records, updates recording and session
//! state, and applies the ledger effects through the reward table. Each
//! operation runs inside one transaction; validation happens before any
//! mutation. Deletion reverses creation exactly, except that debits clamp
//! balances at zero.

use crate::db;
use crate::review::{ledger, Pass, QualityFlags, SessionKind, TrimInput};
use lobe_common::db::RecordingRow;
use lobe_common::economy::Ladder;
use lobe_common::{Error, Result, RewardTable};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// A verification submission
#[derive(Debug, Clone)]
pub struct CreateVerification {
    pub recording_id: i64,
    pub verified_by: i64,
    pub session_id: i64,
    pub session_kind: SessionKind,
    pub pass: Pass,
    pub quality: QualityFlags,
    pub comment: Option<String>,
    pub trims: Vec<TrimInput>,
}

/// Result of a successful creation
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub verification_id: i64,
    pub coins: i64,
    pub experience: i64,
    /// Names of ladders whose next tier was unlocked by this verification
    pub achievements: Vec<String>,
}

/// Result of a successful deletion
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub coins: i64,
    pub experience: i64,
}

/// Verification lifecycle over the shared store
#[derive(Clone)]
pub struct VerificationLifecycle {
    db: SqlitePool,
    rewards: Arc<RewardTable>,
}

impl VerificationLifecycle {
    /// Create new lifecycle with an injected reward table
    pub fn new(db: SqlitePool, rewards: Arc<RewardTable>) -> Self {
        Self { db, rewards }
    }

    /// Record a verification and credit the reviewer
    pub async fn create(&self, req: CreateVerification) -> Result<CreateOutcome> {
        validate_quality(&req.quality)?;
        validate_trims(&req.trims)?;

        let mut tx = self.db.begin().await?;

        if !db::users::exists_tx(&mut tx, req.verified_by).await? {
            return Err(Error::NotFound(format!("verifier {}", req.verified_by)));
        }

        let recording = db::recordings::get_tx(&mut tx, req.recording_id).await?;
        let (kind, owner_id) = owning_session(&recording)?;
        if kind != req.session_kind || owner_id != req.session_id {
            return Err(Error::InvalidInput(format!(
                "recording {} does not belong to {} {}",
                recording.id,
                req.session_kind.table(),
                req.session_id
            )));
        }

        // A recording can be secondarily verified only after it is
        // primarily verified.
        if req.pass.is_secondary() && !recording.is_verified {
            return Err(Error::InvalidInput(format!(
                "recording {} has no primary verification yet",
                recording.id
            )));
        }

        let session = db::sessions::get_tx(&mut tx, kind, req.session_id).await?;
        let session_was_verified = session.is_verified;

        let verification_id = db::verifications::insert_tx(
            &mut tx,
            req.recording_id,
            req.verified_by,
            &req.quality,
            req.comment.as_deref(),
            req.pass.is_secondary(),
        )
        .await?;
        db::verifications::insert_trims_tx(&mut tx, verification_id, &req.trims).await?;

        db::recordings::set_pass_flag_tx(&mut tx, recording.id, req.pass, true).await?;

        let mut progression = db::progressions::get_or_create_tx(&mut tx, req.verified_by).await?;
        let mut achievements = Vec::new();

        // Session completion: every recording now carries the flag for this
        // pass. Completing the primary pass for the first time also pays the
        // flat session reward.
        let (total, done) =
            db::sessions::recording_counts_tx(&mut tx, kind, req.session_id, req.pass).await?;
        if total == done {
            db::sessions::set_completion_tx(&mut tx, kind, req.session_id, req.pass, true).await?;
            if !req.pass.is_secondary() && !session_was_verified {
                progression.num_session_verifies += 1;
                ledger::apply_reward(
                    &mut progression,
                    self.rewards.session.coin_reward,
                    self.rewards.session.experience_reward,
                );
            }
        }

        ledger::apply_reward(
            &mut progression,
            self.rewards.verification.coin_reward,
            self.rewards.verification.experience_reward,
        );
        progression.num_verifies += 1;
        progression.weekly_verifies += 1;
        if !req.quality.is_good() {
            progression.num_invalid += 1;
        }

        for ladder in [Ladder::Verification, Ladder::Spy] {
            if ledger::evaluate_ladder(&mut progression, ladder, &self.rewards)? {
                achievements.push(ladder.name().to_string());
            }
        }

        db::progressions::save_tx(&mut tx, &progression).await?;
        tx.commit().await?;

        info!(
            verification_id,
            verifier = req.verified_by,
            recording = req.recording_id,
            secondary = req.pass.is_secondary(),
            "verification created"
        );

        Ok(CreateOutcome {
            verification_id,
            coins: progression.lobe_coins,
            experience: progression.experience,
            achievements,
        })
    }

    /// Retract a verification, reversing its ledger effects
    pub async fn delete(&self, verification_id: i64) -> Result<DeleteOutcome> {
        let mut tx = self.db.begin().await?;

        let verification = db::verifications::get_tx(&mut tx, verification_id).await?;
        let recording = db::recordings::get_tx(&mut tx, verification.recording_id).await?;
        let (kind, session_id) = owning_session(&recording)?;
        let session = db::sessions::get_tx(&mut tx, kind, session_id).await?;

        let verifier = verification.verified_by.ok_or_else(|| {
            Error::Conflict(format!(
                "verification {} has no verifier on record",
                verification_id
            ))
        })?;
        let mut progression = db::progressions::get_or_create_tx(&mut tx, verifier).await?;

        if verification.is_secondary {
            db::recordings::set_pass_flag_tx(&mut tx, recording.id, Pass::Secondary, false).await?;
            db::sessions::set_completion_tx(&mut tx, kind, session_id, Pass::Secondary, false)
                .await?;
        } else {
            // Deleting the primary while a secondary verification exists
            // would leave the recording secondarily-but-not-primarily
            // verified.
            if recording.is_secondarily_verified {
                return Err(Error::Conflict(format!(
                    "recording {} is secondarily verified; retract that verification first",
                    recording.id
                )));
            }
            db::recordings::set_pass_flag_tx(&mut tx, recording.id, Pass::Primary, false).await?;
            db::sessions::set_completion_tx(&mut tx, kind, session_id, Pass::Primary, false)
                .await?;
            // Only a session that actually was complete had the session
            // reward credited.
            if session.is_verified {
                ledger::apply_debit(
                    &mut progression,
                    self.rewards.session.coin_reward,
                    self.rewards.session.experience_reward,
                );
            }
        }

        ledger::apply_debit(
            &mut progression,
            self.rewards.verification.coin_reward,
            self.rewards.verification.experience_reward,
        );
        progression.num_verifies -= 1;
        progression.weekly_verifies -= 1;
        if !verification.is_good() {
            progression.num_invalid -= 1;
        }

        for ladder in [Ladder::Verification, Ladder::Spy] {
            ledger::de_evaluate_ladder(&mut progression, ladder, &self.rewards)?;
        }

        db::progressions::save_tx(&mut tx, &progression).await?;
        db::verifications::delete_tx(&mut tx, verification_id).await?;
        tx.commit().await?;

        info!(
            verification_id,
            verifier,
            recording = recording.id,
            "verification deleted"
        );

        Ok(DeleteOutcome {
            coins: progression.lobe_coins,
            experience: progression.experience,
        })
    }
}

/// The session a recording belongs to (exactly one of the two kinds)
fn owning_session(recording: &RecordingRow) -> Result<(SessionKind, i64)> {
    match (recording.session_id, recording.priority_session_id) {
        (Some(id), None) => Ok((SessionKind::Normal, id)),
        (None, Some(id)) => Ok((SessionKind::Priority, id)),
        _ => Err(Error::Internal(format!(
            "recording {} has no owning session",
            recording.id
        ))),
    }
}

fn validate_quality(quality: &QualityFlags) -> Result<()> {
    if quality.volume_is_low && quality.volume_is_high {
        return Err(Error::InvalidInput(
            "volume cannot be both low and high".into(),
        ));
    }
    Ok(())
}

fn validate_trims(trims: &[TrimInput]) -> Result<()> {
    let mut prev_start = f64::NEG_INFINITY;
    for (idx, trim) in trims.iter().enumerate() {
        if trim.start < 0.0 {
            return Err(Error::InvalidInput(format!(
                "trim {}: start must not be negative",
                idx
            )));
        }
        if trim.start >= trim.end {
            return Err(Error::InvalidInput(format!(
                "trim {}: start must be before end",
                idx
            )));
        }
        if trim.start < prev_start {
            return Err(Error::InvalidInput(format!(
                "trim {}: trims must be in time order",
                idx
            )));
        }
        prev_start = trim.start;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quality_rejects_low_and_high() {
        let quality = QualityFlags {
            volume_is_low: true,
            volume_is_high: true,
            ..Default::default()
        };
        assert!(matches!(
            validate_quality(&quality),
            Err(Error::InvalidInput(_))
        ));

        assert!(validate_quality(&QualityFlags::default()).is_ok());
    }

    #[test]
    fn test_validate_trims() {
        assert!(validate_trims(&[]).is_ok());
        assert!(validate_trims(&[
            TrimInput {
                start: 0.66,
                end: 0.99
            },
            TrimInput {
                start: 1.18,
                end: 1.61
            },
        ])
        .is_ok());

        // start >= end
        assert!(validate_trims(&[TrimInput {
            start: 1.0,
            end: 1.0
        }])
        .is_err());

        // out of order
        assert!(validate_trims(&[
            TrimInput {
                start: 2.0,
                end: 3.0
            },
            TrimInput {
                start: 0.5,
                end: 1.0
            },
        ])
        .is_err());

        // negative start
        assert!(validate_trims(&[TrimInput {
            start: -0.1,
            end: 1.0
        }])
        .is_err());
    }
}

//! Progression ledger queries
//!
//! One row per reviewer, created lazily on first use. The lifecycle reads
//! and writes the row inside the same transaction as the verification
//! mutation it belongs to.

use lobe_common::db::ProgressionRow;
use lobe_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

const COLUMNS: &str = "user_id, lobe_coins, experience, num_verifies, num_invalid, \
                       weekly_verifies, num_session_verifies, verification_level, \
                       spy_level, last_spin";

/// Get a reviewer's progression row, creating a zeroed one if absent
pub async fn get_or_create_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
) -> Result<ProgressionRow> {
    sqlx::query("INSERT OR IGNORE INTO verifier_progressions (user_id) VALUES (?)")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    let sql = format!(
        "SELECT {} FROM verifier_progressions WHERE user_id = ?",
        COLUMNS
    );
    let row = sqlx::query_as::<_, ProgressionRow>(&sql)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

    Ok(row)
}

/// Persist a mutated progression row
pub async fn save_tx(tx: &mut Transaction<'_, Sqlite>, progression: &ProgressionRow) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE verifier_progressions SET
            lobe_coins = ?,
            experience = ?,
            num_verifies = ?,
            num_invalid = ?,
            weekly_verifies = ?,
            num_session_verifies = ?,
            verification_level = ?,
            spy_level = ?,
            last_spin = ?
        WHERE user_id = ?
        "#,
    )
    .bind(progression.lobe_coins)
    .bind(progression.experience)
    .bind(progression.num_verifies)
    .bind(progression.num_invalid)
    .bind(progression.weekly_verifies)
    .bind(progression.num_session_verifies)
    .bind(progression.verification_level)
    .bind(progression.spy_level)
    .bind(progression.last_spin)
    .bind(progression.user_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Get a reviewer's progression for reporting, zeroed when absent
pub async fn get_or_default(db: &SqlitePool, user_id: i64) -> Result<ProgressionRow> {
    let sql = format!(
        "SELECT {} FROM verifier_progressions WHERE user_id = ?",
        COLUMNS
    );
    let row = sqlx::query_as::<_, ProgressionRow>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(row.unwrap_or(ProgressionRow {
        user_id,
        lobe_coins: 0,
        experience: 0,
        num_verifies: 0,
        num_invalid: 0,
        weekly_verifies: 0,
        num_session_verifies: 0,
        verification_level: 0,
        spy_level: 0,
        last_spin: None,
    }))
}

/// Sum of weekly verifies over all reviewers
pub async fn weekly_total(db: &SqlitePool) -> Result<i64> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(weekly_verifies), 0) FROM verifier_progressions")
            .fetch_one(db)
            .await?;

    Ok(total)
}

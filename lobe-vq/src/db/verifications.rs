//! Verification and trim queries

use crate::pagination::{calculate_pagination, Pagination, PAGE_SIZE};
use crate::review::{QualityFlags, TrimInput};
use lobe_common::db::{TrimRow, VerificationRow};
use lobe_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

const COLUMNS: &str = "id, recording_id, verified_by, volume_is_low, volume_is_high, \
                       has_glitch, has_wrong_wording, comment, is_secondary, created_at";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}

/// Insert a verification row
///
/// A second verification of the same recording for the same pass violates
/// the unique constraint and surfaces as a conflict, so a resubmission can
/// never double-credit the ledger.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Sqlite>,
    recording_id: i64,
    verified_by: i64,
    quality: &QualityFlags,
    comment: Option<&str>,
    is_secondary: bool,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO verifications (
            recording_id, verified_by,
            volume_is_low, volume_is_high, has_glitch, has_wrong_wording,
            comment, is_secondary
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recording_id)
    .bind(verified_by)
    .bind(quality.volume_is_low)
    .bind(quality.volume_is_high)
    .bind(quality.has_glitch)
    .bind(quality.has_wrong_wording)
    .bind(comment)
    .bind(is_secondary)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(Error::Conflict(format!(
            "recording {} already has a {} verification",
            recording_id,
            if is_secondary { "secondary" } else { "primary" }
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Insert the trims of a verification, preserving submission order
pub async fn insert_trims_tx(
    tx: &mut Transaction<'_, Sqlite>,
    verification_id: i64,
    trims: &[TrimInput],
) -> Result<()> {
    for (idx, trim) in trims.iter().enumerate() {
        sqlx::query(
            r#"INSERT INTO trims (verification_id, start, "end", idx) VALUES (?, ?, ?, ?)"#,
        )
        .bind(verification_id)
        .bind(trim.start)
        .bind(trim.end)
        .bind(idx as i64)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Get verification by id (inside a transaction)
pub async fn get_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<VerificationRow> {
    let sql = format!("SELECT {} FROM verifications WHERE id = ?", COLUMNS);
    sqlx::query_as::<_, VerificationRow>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("verification {}", id)))
}

/// Delete a verification; its trims cascade
pub async fn delete_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM verifications WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Get verification by id
pub async fn get(db: &SqlitePool, id: i64) -> Result<VerificationRow> {
    let sql = format!("SELECT {} FROM verifications WHERE id = ?", COLUMNS);
    sqlx::query_as::<_, VerificationRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("verification {}", id)))
}

/// Trims of a verification, in submission order
pub async fn trims(db: &SqlitePool, verification_id: i64) -> Result<Vec<TrimRow>> {
    let rows = sqlx::query_as::<_, TrimRow>(
        r#"SELECT id, verification_id, start, "end", idx FROM trims
           WHERE verification_id = ? ORDER BY idx"#,
    )
    .bind(verification_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// Paginated listing, newest first
pub async fn list(db: &SqlitePool, page: i64) -> Result<(Vec<VerificationRow>, Pagination)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verifications")
        .fetch_one(db)
        .await?;
    let pagination = calculate_pagination(total, page);

    let sql = format!(
        "SELECT {} FROM verifications ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        COLUMNS
    );
    let rows = sqlx::query_as::<_, VerificationRow>(&sql)
        .bind(PAGE_SIZE)
        .bind(pagination.offset)
        .fetch_all(db)
        .await?;

    Ok((rows, pagination))
}

/// All verifications, oldest first, for TSV export
pub async fn all(db: &SqlitePool) -> Result<Vec<VerificationRow>> {
    let sql = format!("SELECT {} FROM verifications ORDER BY id", COLUMNS);
    let rows = sqlx::query_as::<_, VerificationRow>(&sql)
        .fetch_all(db)
        .await?;

    Ok(rows)
}

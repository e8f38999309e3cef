//! Session queries
//!
//! Normal and priority sessions are structurally identical for everything
//! this module touches, so queries are built against
//! [`SessionKind::table`].

use crate::review::{Pass, SessionKind};
use lobe_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Verification state of one session, independent of kind
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionSlots {
    pub id: i64,
    pub is_verified: bool,
    pub is_secondarily_verified: bool,
    pub verified_by: Option<i64>,
    pub secondarily_verified_by: Option<i64>,
}

/// Get the verification slots of a session
pub async fn get_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SessionKind,
    id: i64,
) -> Result<SessionSlots> {
    let sql = format!(
        "SELECT id, is_verified, is_secondarily_verified, verified_by, secondarily_verified_by \
         FROM {} WHERE id = ?",
        kind.table()
    );
    sqlx::query_as::<_, SessionSlots>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} {}", kind.table(), id)))
}

/// Count a session's recordings and how many are verified for a pass
pub async fn recording_counts_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SessionKind,
    session_id: i64,
    pass: Pass,
) -> Result<(i64, i64)> {
    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM({}), 0) FROM recordings WHERE {} = ?",
        pass.flag_column(),
        kind.recording_fk()
    );
    let (total, verified): (i64, i64) = sqlx::query_as(&sql)
        .bind(session_id)
        .fetch_one(&mut **tx)
        .await?;

    Ok((total, verified))
}

/// Set or clear a session's completion flag for one pass
pub async fn set_completion_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SessionKind,
    session_id: i64,
    pass: Pass,
    value: bool,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET {} = ? WHERE id = ?",
        kind.table(),
        pass.flag_column()
    );
    sqlx::query(&sql)
        .bind(value)
        .bind(session_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Administrative assignment release
///
/// Clears the assignment slot of each pass that has not completed, making
/// an abandoned session schedulable again. Completed passes keep their
/// reviewer for attribution.
pub async fn release_assignment(db: &SqlitePool, kind: SessionKind, id: i64) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET \
           verified_by = CASE WHEN is_verified = 0 THEN NULL ELSE verified_by END, \
           secondarily_verified_by = CASE WHEN is_secondarily_verified = 0 \
             THEN NULL ELSE secondarily_verified_by END \
         WHERE id = ?",
        kind.table()
    );
    let rows = sqlx::query(&sql).bind(id).execute(db).await?.rows_affected();
    if rows == 0 {
        return Err(Error::NotFound(format!("{} {}", kind.table(), id)));
    }

    Ok(())
}

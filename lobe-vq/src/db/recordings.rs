//! Recording queries

use crate::review::Pass;
use lobe_common::db::RecordingRow;
use lobe_common::{Error, Result};
use sqlx::{Sqlite, Transaction};

/// Get recording by id
pub async fn get_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<RecordingRow> {
    sqlx::query_as::<_, RecordingRow>(
        r#"
        SELECT id, token_id, session_id, priority_session_id,
               is_verified, is_secondarily_verified, marked_as_bad, created_at
        FROM recordings
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("recording {}", id)))
}

/// Set or clear the verification flag of one pass on a recording
pub async fn set_pass_flag_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    pass: Pass,
    value: bool,
) -> Result<()> {
    let sql = format!("UPDATE recordings SET {} = ? WHERE id = ?", pass.flag_column());
    sqlx::query(&sql)
        .bind(value)
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

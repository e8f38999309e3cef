//! User lookups
//!
//! Accounts are owned by the authentication collaborator; this service only
//! needs existence checks for reviewer ids.

use lobe_common::Result;
use sqlx::{Sqlite, Transaction};

/// Check that a user id exists
pub async fn exists_tx(tx: &mut Transaction<'_, Sqlite>, user_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(found.is_some())
}

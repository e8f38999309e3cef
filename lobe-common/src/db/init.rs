//! Database initialization
//!
//! Creates the schema idempotently on startup. Any service connecting to
//! the shared database calls [`init_database`]; tests create the same
//! schema on an in-memory pool via [`create_schema`].

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers with one writer; the busy timeout
    // serializes concurrent write transactions from the reviewer pool.
    // Foreign keys must be on for the session -> recording and
    // verification -> trim cascades.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_collections_table(pool).await?;
    create_tokens_table(pool).await?;
    create_sessions_table(pool).await?;
    create_priority_sessions_table(pool).await?;
    create_recordings_table(pool).await?;
    create_verifications_table(pool).await?;
    create_trims_table(pool).await?;
    create_progressions_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            is_verify INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection_id INTEGER NOT NULL REFERENCES collections(id),
            text TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection_id INTEGER NOT NULL REFERENCES collections(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            is_verified INTEGER NOT NULL DEFAULT 0,
            is_secondarily_verified INTEGER NOT NULL DEFAULT 0,
            verified_by INTEGER REFERENCES users(id),
            secondarily_verified_by INTEGER REFERENCES users(id),
            is_dev INTEGER NOT NULL DEFAULT 0,
            has_priority INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_priority_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS priority_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection_id INTEGER NOT NULL REFERENCES collections(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            is_verified INTEGER NOT NULL DEFAULT 0,
            is_secondarily_verified INTEGER NOT NULL DEFAULT 0,
            verified_by INTEGER REFERENCES users(id),
            secondarily_verified_by INTEGER REFERENCES users(id),
            is_dev INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recordings_table(pool: &SqlitePool) -> Result<()> {
    // Exactly one of session_id / priority_session_id is set
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token_id INTEGER NOT NULL REFERENCES tokens(id),
            session_id INTEGER REFERENCES sessions(id) ON DELETE CASCADE,
            priority_session_id INTEGER REFERENCES priority_sessions(id) ON DELETE CASCADE,
            is_verified INTEGER NOT NULL DEFAULT 0,
            is_secondarily_verified INTEGER NOT NULL DEFAULT 0,
            marked_as_bad INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK ((session_id IS NULL) != (priority_session_id IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_verifications_table(pool: &SqlitePool) -> Result<()> {
    // The UNIQUE constraint enforces one verification per recording per
    // pass; a resubmission surfaces as a conflict instead of double-crediting
    // the ledger.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recording_id INTEGER NOT NULL REFERENCES recordings(id),
            verified_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            volume_is_low INTEGER NOT NULL DEFAULT 0,
            volume_is_high INTEGER NOT NULL DEFAULT 0,
            has_glitch INTEGER NOT NULL DEFAULT 0,
            has_wrong_wording INTEGER NOT NULL DEFAULT 0,
            comment TEXT,
            is_secondary INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (recording_id, is_secondary)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_trims_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trims (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            verification_id INTEGER NOT NULL REFERENCES verifications(id) ON DELETE CASCADE,
            start REAL NOT NULL,
            "end" REAL NOT NULL,
            idx INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_progressions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifier_progressions (
            user_id INTEGER PRIMARY KEY REFERENCES users(id),
            lobe_coins INTEGER NOT NULL DEFAULT 0,
            experience INTEGER NOT NULL DEFAULT 0,
            num_verifies INTEGER NOT NULL DEFAULT 0,
            num_invalid INTEGER NOT NULL DEFAULT 0,
            weekly_verifies INTEGER NOT NULL DEFAULT 0,
            num_session_verifies INTEGER NOT NULL DEFAULT 0,
            verification_level INTEGER NOT NULL DEFAULT 0,
            spy_level INTEGER NOT NULL DEFAULT 0,
            last_spin TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_schema_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_recording_must_belong_to_exactly_one_session() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO users (name) VALUES ('a')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO collections (name, is_verify) VALUES ('c', 1)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tokens (collection_id, text) VALUES (1, 't')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sessions (collection_id, user_id) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();

        // Neither session set
        let err = sqlx::query("INSERT INTO recordings (token_id) VALUES (1)")
            .execute(&pool)
            .await;
        assert!(err.is_err());

        // Exactly one set is fine
        sqlx::query("INSERT INTO recordings (token_id, session_id) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_verification_rejected() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO users (name) VALUES ('a')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO collections (name, is_verify) VALUES ('c', 1)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tokens (collection_id, text) VALUES (1, 't')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sessions (collection_id, user_id) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO recordings (token_id, session_id) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("INSERT INTO verifications (recording_id, verified_by) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap();
        let dup = sqlx::query("INSERT INTO verifications (recording_id, verified_by) VALUES (1, 1)")
            .execute(&pool)
            .await;
        assert!(dup.is_err());

        // A secondary verification of the same recording is a different pass
        sqlx::query(
            "INSERT INTO verifications (recording_id, verified_by, is_secondary) VALUES (1, 1, 1)",
        )
        .execute(&pool)
        .await
        .unwrap();
    }
}

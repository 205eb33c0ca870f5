//! SQLite connection pool and schema setup for the Mapping Store.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

/// Open (creating if missing) the SQLite database backing the Mapping Store:
/// create-if-missing, WAL journal, foreign keys on, a bounded pool.
pub async fn create_pool(db_path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issue_sync_records (
            sync_id TEXT PRIMARY KEY,
            left_key TEXT,
            right_key TEXT,
            status TEXT NOT NULL,
            last_sync_direction TEXT,
            last_sync_timestamp TEXT NOT NULL,
            left_last_updated TEXT,
            right_last_updated TEXT,
            error_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            requires_manual_resolution INTEGER NOT NULL DEFAULT 0,
            conflict_details TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issue_sync_left_key ON issue_sync_records(left_key)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issue_sync_right_key ON issue_sync_records(right_key)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issue_sync_status ON issue_sync_records(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comment_sync_records (
            sync_id TEXT PRIMARY KEY,
            issue_key TEXT NOT NULL,
            source_comment_id TEXT NOT NULL,
            target_comment_id TEXT,
            source_side TEXT NOT NULL,
            target_side TEXT NOT NULL,
            last_sync_timestamp TEXT NOT NULL,
            sync_direction TEXT,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comment_sync_issue_key ON comment_sync_records(issue_key)")
        .execute(pool)
        .await?;

    Ok(())
}

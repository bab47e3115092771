//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;
use tracing::info;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS campaign_threads (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'not_started'
            );
            CREATE INDEX IF NOT EXISTS idx_campaign_threads_status ON campaign_threads(status);

            CREATE TABLE IF NOT EXISTS voice_calls (
                id TEXT PRIMARY KEY,
                campaign_thread_id TEXT NOT NULL REFERENCES campaign_threads(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                called_at TEXT,
                transcript TEXT NOT NULL,
                time_zone TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_voice_calls_thread ON voice_calls(campaign_thread_id);

            CREATE TABLE IF NOT EXISTS classifications (
                id TEXT PRIMARY KEY,
                campaign_thread_id TEXT NOT NULL REFERENCES campaign_threads(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                interested_time TEXT,
                call_back_time TEXT,
                intent TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_classifications_thread ON classifications(campaign_thread_id);
        "#,
    },
    Migration {
        version: 2,
        name: "classification_voice_call_link",
        sql: r#"
            ALTER TABLE classifications ADD COLUMN voice_call_id TEXT REFERENCES voice_calls(id);
            CREATE INDEX IF NOT EXISTS idx_classifications_voice_call ON classifications(voice_call_id);
        "#,
    },
];

/// Run all pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("create _migrations: {e}")))?;

    let current = get_current_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(migration.sql).await.map_err(|e| {
            DatabaseError::Migration(format!(
                "V{} ({}) failed: {e}",
                migration.version, migration.name
            ))
        })?;
        seed_version(conn, migration.version, migration.name).await?;
        info!(version = migration.version, name = migration.name, "Applied migration");
    }

    Ok(())
}

/// Highest applied version, or 0 for a fresh database.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("read version: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| DatabaseError::Migration(format!("read version: {e}"))),
        Ok(None) => Ok(0),
        Err(e) => Err(DatabaseError::Migration(format!("read version: {e}"))),
    }
}

async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("record V{version}: {e}")))?;
    Ok(())
}

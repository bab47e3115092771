//! Thread status repository.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::campaign::{CampaignThread, ThreadStatus};
use crate::error::DatabaseError;
use crate::store::handle::{DbHandle, text, timestamp};

const THREAD_COLUMNS: &str = "id, created_at, updated_at, status";

/// Parse an RFC 3339 or SQLite datetime string into `DateTime<Utc>`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Like [`parse_datetime`], but a value in neither format is an error.
pub(crate) fn parse_stored_datetime(
    column: &str,
    s: &str,
) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| DatabaseError::Serialization(format!("{column} '{s}': {e}")))
}

fn row_to_thread(row: &libsql::Row) -> Result<CampaignThread, DatabaseError> {
    let created_str: String = row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let updated_str: String = row.get(2).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let status_str: String = row.get(3).map_err(|e| DatabaseError::Query(e.to_string()))?;
    Ok(CampaignThread {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
        status: status_str.parse().map_err(DatabaseError::Serialization)?,
    })
}

/// Insert a thread. Threads are owned upstream; this exists for seeding.
pub async fn insert(
    db: &dyn DbHandle,
    id: &str,
    status: ThreadStatus,
) -> Result<CampaignThread, DatabaseError> {
    let now = Utc::now();
    db.execute(
        "INSERT INTO campaign_threads (id, created_at, updated_at, status) VALUES (?1, ?2, ?3, ?4)",
        vec![
            text(id),
            timestamp(now),
            timestamp(now),
            text(status.as_str()),
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_thread: {e}")))?;

    Ok(CampaignThread {
        id: id.to_string(),
        created_at: now,
        updated_at: now,
        status,
    })
}

pub async fn get(db: &dyn DbHandle, id: &str) -> Result<Option<CampaignThread>, DatabaseError> {
    let mut rows = db
        .query(
            &format!("SELECT {THREAD_COLUMNS} FROM campaign_threads WHERE id = ?1"),
            vec![text(id)],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("get_thread: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => Ok(Some(row_to_thread(&row)?)),
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("get_thread: {e}"))),
    }
}

/// All threads in `status`, oldest first.
pub async fn list_by_status(
    db: &dyn DbHandle,
    status: ThreadStatus,
) -> Result<Vec<CampaignThread>, DatabaseError> {
    let mut rows = db
        .query(
            &format!(
                "SELECT {THREAD_COLUMNS} FROM campaign_threads WHERE status = ?1 ORDER BY created_at, id"
            ),
            vec![text(status.as_str())],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("list_threads_by_status: {e}")))?;

    let mut threads = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("list_threads_by_status: {e}")))?
    {
        threads.push(row_to_thread(&row)?);
    }
    Ok(threads)
}

/// Set a thread's workflow status. Runs on whatever handle the caller passes.
pub async fn update_status(
    db: &dyn DbHandle,
    id: &str,
    status: ThreadStatus,
) -> Result<(), DatabaseError> {
    db.execute(
        "UPDATE campaign_threads SET status = ?1, updated_at = ?2 WHERE id = ?3",
        vec![text(status.as_str()), timestamp(Utc::now()), text(id)],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("update_status: {e}")))?;

    debug!(thread_id = %id, status = %status, "Thread status updated");
    Ok(())
}

/// Move a thread from `from` to `to`. Returns `false` when the thread is
/// missing or no longer in `from`, in which case nothing is written.
pub async fn transition_status(
    db: &dyn DbHandle,
    id: &str,
    from: ThreadStatus,
    to: ThreadStatus,
) -> Result<bool, DatabaseError> {
    let changed = db
        .execute(
            "UPDATE campaign_threads SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            vec![
                text(to.as_str()),
                timestamp(Utc::now()),
                text(id),
                text(from.as_str()),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("transition_status: {e}")))?;

    if changed > 0 {
        debug!(thread_id = %id, from = %from, to = %to, "Thread status advanced");
    }
    Ok(changed > 0)
}

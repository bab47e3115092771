//! Classification repository, plus read access to the voice calls it is built from.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use libsql::Value;
use tracing::debug;

use crate::campaign::{Classification, Intent, NewClassification, VoiceCall};
use crate::error::DatabaseError;
use crate::store::handle::{DbHandle, opt_text, text, timestamp};
use crate::store::threads::{parse_datetime, parse_stored_datetime};

const VOICE_CALL_COLUMNS: &str = "id, campaign_thread_id, created_at, called_at, transcript, time_zone";

const CLASSIFICATION_COLUMNS: &str =
    "id, campaign_thread_id, voice_call_id, created_at, updated_at, interested_time, call_back_time, intent";

fn row_to_voice_call(row: &libsql::Row) -> Result<VoiceCall, DatabaseError> {
    let created_str: String = row.get(2).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let called_str: Option<String> = row.get(3).ok();
    // The call time is fed to the model, so a corrupt value must not pass silently.
    Ok(VoiceCall {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        campaign_thread_id: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        created_at: parse_stored_datetime("created_at", &created_str)?,
        called_at: called_str
            .as_deref()
            .map(|s| parse_stored_datetime("called_at", s))
            .transpose()?,
        transcript: row.get(4).map_err(|e| DatabaseError::Query(e.to_string()))?,
        time_zone: row.get(5).map_err(|e| DatabaseError::Query(e.to_string()))?,
    })
}

/// Stored local times keep their offset, so they read back with the same wall clock.
fn parse_local_time(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<FixedOffset>>, DatabaseError> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map_err(|e| DatabaseError::Serialization(format!("{column} '{s}': {e}")))
        })
        .transpose()
}

fn local_time_value(dt: Option<&DateTime<FixedOffset>>) -> Value {
    opt_text(dt.map(|d| d.to_rfc3339()))
}

fn row_to_classification(row: &libsql::Row) -> Result<Classification, DatabaseError> {
    let created_str: String = row.get(3).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let updated_str: String = row.get(4).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let intent: String = row.get(7).map_err(|e| DatabaseError::Query(e.to_string()))?;
    Ok(Classification {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        campaign_thread_id: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        voice_call_id: row.get(2).ok(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
        interested_time: parse_local_time("interested_time", row.get(5).ok())?,
        call_back_time: parse_local_time("call_back_time", row.get(6).ok())?,
        intent: Intent::from(intent),
    })
}

/// Voice calls on a thread, oldest first.
pub async fn list_voice_calls_for_thread(
    db: &dyn DbHandle,
    thread_id: &str,
) -> Result<Vec<VoiceCall>, DatabaseError> {
    let mut rows = db
        .query(
            &format!(
                "SELECT {VOICE_CALL_COLUMNS} FROM voice_calls WHERE campaign_thread_id = ?1 ORDER BY created_at, id"
            ),
            vec![text(thread_id)],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("list_voice_calls: {e}")))?;

    let mut calls = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("list_voice_calls: {e}")))?
    {
        calls.push(row_to_voice_call(&row)?);
    }
    Ok(calls)
}

/// Record a voice call. Calls are written upstream; this exists for seeding.
pub async fn insert_voice_call(
    db: &dyn DbHandle,
    id: &str,
    thread_id: &str,
    called_at: Option<DateTime<Utc>>,
    transcript: &str,
    time_zone: &str,
) -> Result<VoiceCall, DatabaseError> {
    let now = Utc::now();
    db.execute(
        "INSERT INTO voice_calls (id, campaign_thread_id, created_at, called_at, transcript, time_zone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        vec![
            text(id),
            text(thread_id),
            timestamp(now),
            called_at.map(timestamp).unwrap_or(Value::Null),
            text(transcript),
            text(time_zone),
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_voice_call: {e}")))?;

    Ok(VoiceCall {
        id: id.to_string(),
        campaign_thread_id: thread_id.to_string(),
        created_at: now,
        called_at,
        transcript: transcript.to_string(),
        time_zone: time_zone.to_string(),
    })
}

/// Persist one classification. Runs on whatever handle the caller passes.
pub async fn insert(db: &dyn DbHandle, new: &NewClassification) -> Result<(), DatabaseError> {
    let now = timestamp(Utc::now());
    db.execute(
        "INSERT INTO classifications
            (id, campaign_thread_id, voice_call_id, created_at, updated_at, interested_time, call_back_time, intent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        vec![
            text(new.id.as_str()),
            text(new.campaign_thread_id.as_str()),
            opt_text(new.voice_call_id.clone()),
            now.clone(),
            now,
            local_time_value(new.interested_time.as_ref()),
            local_time_value(new.call_back_time.as_ref()),
            text(new.intent.as_str()),
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_classification: {e}")))?;

    debug!(
        thread_id = %new.campaign_thread_id,
        classification_id = %new.id,
        intent = %new.intent,
        "Classification stored"
    );
    Ok(())
}

/// Classifications on a thread, oldest first.
pub async fn list_for_thread(
    db: &dyn DbHandle,
    thread_id: &str,
) -> Result<Vec<Classification>, DatabaseError> {
    let mut rows = db
        .query(
            &format!(
                "SELECT {CLASSIFICATION_COLUMNS} FROM classifications WHERE campaign_thread_id = ?1 ORDER BY created_at, id"
            ),
            vec![text(thread_id)],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("list_classifications: {e}")))?;

    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("list_classifications: {e}")))?
    {
        out.push(row_to_classification(&row)?);
    }
    Ok(out)
}

/// Ids of the thread's voice calls that already have a classification.
pub async fn classified_call_ids(
    db: &dyn DbHandle,
    thread_id: &str,
) -> Result<HashSet<String>, DatabaseError> {
    let mut rows = db
        .query(
            "SELECT voice_call_id FROM classifications
             WHERE campaign_thread_id = ?1 AND voice_call_id IS NOT NULL",
            vec![text(thread_id)],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("classified_call_ids: {e}")))?;

    let mut ids = HashSet::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("classified_call_ids: {e}")))?
    {
        ids.insert(
            row.get::<String>(0)
                .map_err(|e| DatabaseError::Query(e.to_string()))?,
        );
    }
    Ok(ids)
}

//! Per-thread processing: classify every voice call, then advance the thread.
//!
//! Flow for one thread:
//! 1. Refuse threads that are missing or not `voice_call_unclassified`
//! 2. Load its voice calls (oldest first) and the ids already classified
//! 3. Classify each remaining call and insert its row on the shared connection
//! 4. Stop at the first failure, leaving the thread status untouched
//! 5. Otherwise flip the status to `voice_call_classified` in a transaction,
//!    provided nothing else moved the thread in the meantime

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::campaign::{NewClassification, ThreadStatus, VoiceCall};
use crate::classifier::{ClassifyParams, Classifier};
use crate::error::ProcessError;
use crate::store::LibSqlBackend;
use crate::store::libsql_backend::{commit, rollback};
use crate::store::{classifications, threads};

/// What happened to a thread during one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// No voice calls yet; the thread stays unclassified.
    NoCalls,
    /// Every call has a classification and the status was advanced.
    Classified {
        /// Calls classified in this run.
        classified: usize,
        /// Calls skipped because an earlier run already classified them.
        skipped: usize,
    },
}

/// Drives the classifier over the calls of one campaign thread.
pub struct ThreadProcessor {
    backend: Arc<LibSqlBackend>,
    classifier: Arc<dyn Classifier>,
}

impl ThreadProcessor {
    pub fn new(backend: Arc<LibSqlBackend>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            backend,
            classifier,
        }
    }

    /// Classify the thread's outstanding calls and advance its status.
    ///
    /// Fails fast: the first call that cannot be classified or stored aborts the
    /// run. Rows inserted before the failure stay; the next run skips them.
    /// A thread that is not awaiting classification yields
    /// [`ProcessError::NotPending`] and is never written to.
    pub async fn process_thread(&self, thread_id: &str) -> Result<ThreadOutcome, ProcessError> {
        let conn = self.backend.conn();

        let current = threads::get(conn, thread_id).await?.map(|t| t.status);
        if current != Some(ThreadStatus::VoiceCallUnclassified) {
            return Err(not_pending(thread_id, current));
        }

        let calls = classifications::list_voice_calls_for_thread(conn, thread_id).await?;
        if calls.is_empty() {
            debug!(thread_id = %thread_id, "No voice calls yet");
            return Ok(ThreadOutcome::NoCalls);
        }

        let done = classifications::classified_call_ids(conn, thread_id).await?;

        let mut classified = 0;
        let mut skipped = 0;
        for call in &calls {
            if done.contains(&call.id) {
                skipped += 1;
                continue;
            }
            self.classify_call(thread_id, call).await?;
            classified += 1;
        }

        self.mark_classified(thread_id).await?;

        info!(
            thread_id = %thread_id,
            classified,
            skipped,
            "Thread classified"
        );
        Ok(ThreadOutcome::Classified {
            classified,
            skipped,
        })
    }

    async fn classify_call(&self, thread_id: &str, call: &VoiceCall) -> Result<(), ProcessError> {
        let params = ClassifyParams {
            transcript: call.transcript.clone(),
            timezone: call.time_zone.clone(),
            called_at: call.call_time(),
        };

        let response = self
            .classifier
            .classify(params)
            .await
            .map_err(|source| ProcessError::Classify {
                call_id: call.id.clone(),
                source,
            })?;

        let new = NewClassification {
            id: Uuid::new_v4().to_string(),
            campaign_thread_id: thread_id.to_string(),
            voice_call_id: Some(call.id.clone()),
            intent: response.intent,
            interested_time: response.interested_time.map(|t| t.fixed_offset()),
            call_back_time: response.call_back_time.map(|t| t.fixed_offset()),
        };
        classifications::insert(self.backend.conn(), &new).await?;

        info!(
            thread_id = %thread_id,
            call_id = %call.id,
            intent = %new.intent,
            "Voice call classified"
        );
        Ok(())
    }

    /// The status transition is the only step behind a commit boundary. It only
    /// applies while the thread is still `voice_call_unclassified`.
    async fn mark_classified(&self, thread_id: &str) -> Result<(), ProcessError> {
        let tx = self.backend.transaction().await?;
        let moved = threads::transition_status(
            &tx,
            thread_id,
            ThreadStatus::VoiceCallUnclassified,
            ThreadStatus::VoiceCallClassified,
        )
        .await;

        let err = match moved {
            Ok(true) => {
                commit(tx).await?;
                return Ok(());
            }
            Ok(false) => {
                let current = threads::get(&tx, thread_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|t| t.status);
                not_pending(thread_id, current)
            }
            Err(e) => ProcessError::from(e),
        };

        if let Err(rollback_err) = rollback(tx).await {
            warn!(
                thread_id = %thread_id,
                error = %rollback_err,
                "Rollback after failed status update also failed"
            );
        }
        Err(err)
    }
}

fn not_pending(thread_id: &str, status: Option<ThreadStatus>) -> ProcessError {
    ProcessError::NotPending {
        thread_id: thread_id.to_string(),
        status: status.map_or_else(|| "missing".to_string(), |s| s.to_string()),
    }
}

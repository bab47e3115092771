//! Polling scheduler: every tick, process each thread still awaiting classification.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::campaign::ThreadStatus;
use crate::classifier::LlmClassifier;
use crate::config::ClassifierConfig;
use crate::error::DatabaseError;
use crate::llm::{LlmConfig, create_provider};
use crate::pipeline::thread_processor::{ThreadOutcome, ThreadProcessor};
use crate::store::{LibSqlBackend, threads};

/// Counts from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub threads: usize,
    pub classified: usize,
    pub waiting: usize,
    pub failed: usize,
}

pub struct ClassificationScheduler {
    backend: Arc<LibSqlBackend>,
    processor: ThreadProcessor,
    interval: Duration,
}

impl ClassificationScheduler {
    pub fn new(backend: Arc<LibSqlBackend>, processor: ThreadProcessor, interval: Duration) -> Self {
        Self {
            backend,
            processor,
            interval,
        }
    }

    /// Open the database and wire the LLM classifier described by `config`.
    pub async fn from_config(config: &ClassifierConfig) -> crate::error::Result<Self> {
        let backend = Arc::new(
            LibSqlBackend::open(&config.database.url, &config.database.auth_token).await?,
        );
        let llm = create_provider(&LlmConfig {
            base_url: config.llm_base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })?;
        let classifier = Arc::new(LlmClassifier::new(llm));
        let processor = ThreadProcessor::new(Arc::clone(&backend), classifier);
        Ok(Self::new(backend, processor, config.poll_interval))
    }

    /// Process every unclassified thread once, oldest first.
    ///
    /// A failing thread is logged and left for the next tick. Only the initial
    /// listing query can fail the tick as a whole.
    pub async fn run_tick(&self) -> Result<TickSummary, DatabaseError> {
        let pending = threads::list_by_status(self.backend.conn(), ThreadStatus::VoiceCallUnclassified)
            .await?;

        let mut summary = TickSummary {
            threads: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return Ok(summary);
        }

        info!("Processing {} unclassified thread(s)", pending.len());

        for thread in &pending {
            match self.processor.process_thread(&thread.id).await {
                Ok(ThreadOutcome::Classified { .. }) => summary.classified += 1,
                Ok(ThreadOutcome::NoCalls) => summary.waiting += 1,
                Err(e) => {
                    error!(thread_id = %thread.id, error = %e, "Failed to process thread");
                    summary.failed += 1;
                }
            }
        }

        info!(
            classified = summary.classified,
            waiting = summary.waiting,
            failed = summary.failed,
            "Tick complete"
        );
        Ok(summary)
    }

    /// Run ticks until `true` is sent on the returned channel (or it is dropped).
    ///
    /// Shutdown is seen only between ticks; a tick in progress runs to the end.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!("Classification scheduler started, polling every {:?}", self.interval);

            let mut tick = tokio::time::interval(self.interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // First tick fires immediately.
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = tick.tick() => {}
                }

                if *shutdown_rx.borrow() {
                    break;
                }

                if let Err(e) = self.run_tick().await {
                    error!(error = %e, "Failed to list unclassified threads");
                }
            }

            info!("Classification scheduler shutting down");
        });

        (handle, shutdown_tx)
    }
}

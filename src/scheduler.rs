//! Background compression: cooperatively drains each idle session's
//! short-term overflow queue, summarizes it, embeds the result, and
//! cascades overflowing layers forward.

use crate::collaborators::{Embedder, SummaryLevel, Summarizer};
use crate::config::SchedulerConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::layer::CompressionBatch;
use crate::message::Layer;
use crate::session::Session;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Sessions the scheduler draws from, shared with whatever owns session
/// lifecycle (the `SessionManager`).
pub type SessionRegistry = RwLock<HashMap<String, Arc<Session>>>;

/// Drives compression for every session in a shared registry. Construct
/// once per `SessionManager`; `spawn` starts the background loop.
pub struct CompressionScheduler {
    config: SchedulerConfig,
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    registry: Arc<SessionRegistry>,
    notify: Arc<Notify>,
    retry_counts: Mutex<HashMap<String, u32>>,
    /// Earliest time a session is eligible for its next retry, set by
    /// [`Self::retry_or_park`] and consulted by [`Self::tick`].
    retry_not_before: Mutex<HashMap<String, OffsetDateTime>>,
}

impl CompressionScheduler {
    pub fn new(
        config: SchedulerConfig,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config,
            summarizer,
            embedder,
            registry,
            notify: Arc::new(Notify::new()),
            retry_counts: Mutex::new(HashMap::new()),
            retry_not_before: Mutex::new(HashMap::new()),
        }
    }

    /// Wake the scheduler early, e.g. right after a message pushes a
    /// session's compression queue past its minimum batch size.
    pub fn notify_handle(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    pub fn forget_session(&self, session_id: &str) {
        self.retry_counts.lock().remove(session_id);
        self.retry_not_before.lock().remove(session_id);
    }

    /// Spawn the periodic background loop. The returned handle should be
    /// aborted on shutdown; dropping it does not stop the task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = self.notify.notified() => {}
                }
                self.tick().await;
            }
        })
    }

    /// One round: every non-quarantined session idle past `idle_threshold`
    /// gets at most one batch drained, in session-id order (a stable,
    /// if arbitrary, round-robin).
    pub async fn tick(&self) {
        let mut session_ids: Vec<String> = self.registry.read().keys().cloned().collect();
        session_ids.sort();

        for session_id in session_ids {
            let Some(session) = self.registry.read().get(&session_id).cloned() else {
                continue;
            };
            if session.is_quarantined() {
                continue;
            }
            if session.idle_for() < self.config.idle_threshold {
                continue;
            }
            if let Some(not_before) = self.retry_not_before.lock().get(&session_id).copied() {
                if OffsetDateTime::now_utc() < not_before {
                    continue;
                }
            }
            if let Err(err) = self.process_session(&session).await {
                tracing::warn!(session_id = %session_id, error = %err, "compression batch deferred");
            }
        }
    }

    async fn process_session(&self, session: &Arc<Session>) -> MemoryResult<()> {
        let Some(batch) = session.drain_compression_batch(self.config.batch_max) else {
            return Ok(());
        };
        if batch.messages.len() < self.config.batch_min {
            session.requeue_front(batch);
            return Ok(());
        }

        let level = if session.idle_for() >= self.config.deep_idle_threshold {
            SummaryLevel::Brief
        } else {
            SummaryLevel::Medium
        };
        let oldest_source_at = batch
            .messages
            .iter()
            .map(|m| m.created_at)
            .min()
            .unwrap_or_else(OffsetDateTime::now_utc);

        let result = self.summarize_and_ingest(session, &batch, level, oldest_source_at).await;
        match result {
            Ok(()) => {
                self.retry_counts.lock().remove(&session.id);
                self.retry_not_before.lock().remove(&session.id);
                Ok(())
            }
            Err(err) => self.retry_or_park(session, batch, err),
        }
    }

    async fn summarize_and_ingest(
        &self,
        session: &Arc<Session>,
        batch: &CompressionBatch,
        level: SummaryLevel,
        oldest_source_at: OffsetDateTime,
    ) -> MemoryResult<()> {
        let output = self
            .summarizer
            .summarize(&batch.messages, level)
            .await
            .map_err(|_| MemoryError::LLMUnavailable)?;
        let embedding = self
            .embedder
            .embed(&output.content)
            .await
            .map_err(|_| MemoryError::EmbeddingUnavailable)?;

        let overflowed = session.ingest_summary(output, level, embedding, Layer::MediumTerm, oldest_source_at)?;
        if overflowed {
            self.cascade(session, Layer::MediumTerm)?;
        }
        Ok(())
    }

    /// Recursively cascade an overflowing layer's oldest record(s) forward,
    /// bounded by the number of layers (medium -> long -> archived; archived
    /// has no further destination and simply grows).
    fn cascade(&self, session: &Arc<Session>, from: Layer) -> MemoryResult<()> {
        session.cascade_oldest(from)?;
        let Some(to) = from.next() else {
            return Ok(());
        };
        let stats = session.stats();
        let (count, capacity) = match to {
            Layer::LongTerm => (stats.long_term, session.config_long_term_max()),
            Layer::Archived => return Ok(()),
            _ => return Ok(()),
        };
        if count > capacity {
            self.cascade(session, to)?;
        }
        Ok(())
    }

    fn retry_or_park(&self, session: &Arc<Session>, batch: CompressionBatch, err: MemoryError) -> MemoryResult<()> {
        let mut counts = self.retry_counts.lock();
        let attempts = counts.entry(session.id.clone()).or_insert(0);
        *attempts += 1;
        let attempts = *attempts;
        if attempts > self.config.max_retry_attempts {
            tracing::error!(
                session_id = %session.id,
                error = %err,
                attempts = attempts,
                "compression batch exhausted retries, parking to dead letter"
            );
            counts.remove(&session.id);
            drop(counts);
            self.retry_not_before.lock().remove(&session.id);
            session.park_dead_letter(batch);
            return Ok(());
        }
        drop(counts);

        let backoff = self.config.retry_backoff_base * 2u32.saturating_pow(attempts.saturating_sub(1));
        self.retry_not_before
            .lock()
            .insert(session.id.clone(), OffsetDateTime::now_utc() + backoff);

        session.requeue_front(batch);
        Err(err)
    }
}

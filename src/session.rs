//! `HierarchicalMemory`: the five-layer state for one session, and the
//! public verbs callers use to add, query, bookmark, snapshot and clear it.

use crate::bookmark::{Bookmark, BookmarkStore};
use crate::collaborators::{Embedder, SummarizationOutput, SummaryLevel};
use crate::config::MemoryConfig;
use crate::crypto::CryptoEnvelope;
use crate::error::{MemoryError, MemoryResult};
use crate::layer::{CompressionBatch, LayerStore};
use crate::message::{Layer, Message, Metadata, Role};
use crate::storage::SessionStorage;
use crate::summary::SummaryRecord;
use crate::vector::{BruteForceIndex, VectorIndex};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;

/// Project-type tag. Medical variants always imply `encrypted = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    MedicalPeer,
    MedicalAssistant,
    Storytelling,
    GeneralChat,
    GeneralAssistant,
}

impl ProjectType {
    pub fn is_medical(self) -> bool {
        matches!(self, ProjectType::MedicalPeer | ProjectType::MedicalAssistant)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::MedicalPeer => "medical_peer",
            ProjectType::MedicalAssistant => "medical_assistant",
            ProjectType::Storytelling => "storytelling",
            ProjectType::GeneralChat => "general_chat",
            ProjectType::GeneralAssistant => "general_assistant",
        }
    }
}

/// Default set of layers a `query` searches when the caller doesn't specify
/// one: the three vector-indexed tiers.
pub fn default_query_layers() -> Vec<Layer> {
    vec![Layer::MediumTerm, Layer::LongTerm, Layer::Archived]
}

/// A single ranked query hit, merged across whichever layers were searched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub layer: Layer,
    /// Message id (as a string) for active/short_term hits, summary id for
    /// vector-indexed hits.
    pub result_id: String,
    pub content: String,
    pub score: f32,
}

/// Per-layer and aggregate counters returned by `stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub active: usize,
    pub short_term: usize,
    pub medium_term: usize,
    pub long_term: usize,
    pub archived: usize,
    pub compression_queue: usize,
    pub dead_letter: usize,
    pub bookmarks: usize,
    pub message_count: u64,
    pub summary_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_compression_tick: Option<OffsetDateTime>,
}

/// Describes a session for `list_sessions()` without requiring a lock on
/// its internals beyond a snapshot read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub id: String,
    pub project_type: ProjectType,
    pub encrypted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity: OffsetDateTime,
    pub stats: SessionStats,
}

/// Protected by the session's own lock: everything that mutates on the
/// foreground add/query/bookmark path plus the background compression
/// path.
struct SessionInner {
    layers: LayerStore,
    next_message_id: u64,
    next_sequence: u64,
    message_count: u64,
    summary_count: u64,
    last_activity_wall: OffsetDateTime,
    last_compression_tick: Option<OffsetDateTime>,
}

/// One session's full in-RAM state: five layers, bookmark registry, and
/// (for encrypted sessions) the live data-encryption key.
pub struct Session {
    pub id: String,
    pub project_type: ProjectType,
    pub encrypted: bool,
    pub created_at: OffsetDateTime,
    config: MemoryConfig,
    storage: SessionStorage,
    inner: Mutex<SessionInner>,
    vector_index: Arc<dyn VectorIndex>,
    bookmarks: BookmarkStore,
    envelope: Mutex<Option<CryptoEnvelope>>,
    quarantined: AtomicBool,
    /// Monotonic idle clock read by the scheduler; cheaper than locking
    /// `inner` just to check eligibility.
    last_activity_monotonic: Mutex<Instant>,
    next_summary_seq: AtomicU64,
}

impl Session {
    pub fn new(
        id: String,
        project_type: ProjectType,
        encrypted: bool,
        storage: SessionStorage,
        config: MemoryConfig,
        envelope: Option<CryptoEnvelope>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            project_type,
            encrypted,
            created_at: now,
            storage,
            inner: Mutex::new(SessionInner {
                layers: LayerStore::new(config.layers.clone()),
                next_message_id: 0,
                next_sequence: 0,
                message_count: 0,
                summary_count: 0,
                last_activity_wall: now,
                last_compression_tick: None,
            }),
            vector_index: Arc::new(BruteForceIndex::new()),
            bookmarks: BookmarkStore::new(),
            envelope: Mutex::new(envelope),
            quarantined: AtomicBool::new(false),
            last_activity_monotonic: Mutex::new(Instant::now()),
            next_summary_seq: AtomicU64::new(0),
            config,
        }
    }

    /// Rehydrate in-RAM state (active/short_term messages, bookmarks, and
    /// every vector-indexed summary record) from what's already on disk.
    /// Called once when a `SessionManager` opens a session that already
    /// has a directory.
    pub(crate) fn restore_from_disk(&self) -> MemoryResult<usize> {
        let envelope = self.envelope.lock();
        let messages = self.storage.read_messages(envelope.as_ref())?;
        let bookmarks = self.storage.read_bookmarks(envelope.as_ref())?;

        let active: Vec<Message> = messages.iter().filter(|m| m.layer == Layer::Active).cloned().collect();
        let short: Vec<Message> = messages
            .iter()
            .filter(|m| m.layer == Layer::ShortTerm)
            .cloned()
            .collect();
        let max_id = messages.iter().map(|m| m.id).max();
        let max_sequence = messages.iter().map(|m| m.sequence).max();

        let mut total_failures = 0usize;
        let mut summary_count = 0u64;
        let mut max_summary_seq: Option<u64> = None;
        let prefix = format!("{}-", self.id);
        for layer in [Layer::MediumTerm, Layer::LongTerm, Layer::Archived] {
            let (records, failures) = self.storage.load_layer_summaries(envelope.as_ref(), layer)?;
            total_failures += failures;
            summary_count += records.len() as u64;
            for (record, embedding) in records {
                if let Some(seq) = record.id.strip_prefix(&prefix).and_then(|s| s.parse::<u64>().ok()) {
                    max_summary_seq = Some(max_summary_seq.map_or(seq, |m: u64| m.max(seq)));
                }
                self.vector_index.upsert(layer, record, embedding);
            }
        }
        drop(envelope);
        if let Some(seq) = max_summary_seq {
            self.next_summary_seq.store(seq + 1, Ordering::Relaxed);
        }

        {
            let mut inner = self.inner.lock();
            inner.message_count = messages.len() as u64;
            inner.summary_count = summary_count;
            inner.next_message_id = max_id.map(|m| m + 1).unwrap_or(0);
            inner.next_sequence = max_sequence.map(|s| s + 1).unwrap_or(0);
            inner.layers.restore(active, short);
        }
        for b in bookmarks {
            self.bookmarks.restore(b);
        }
        self.refresh_bookmark_orphans();
        Ok(total_failures)
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantined.load(Ordering::Acquire)
    }

    fn quarantine(&self, reason: &str) {
        tracing::warn!(session_id = %self.id, reason, "session quarantined");
        self.quarantined.store(true, Ordering::Release);
    }

    fn touch_activity(&self, inner: &mut SessionInner) {
        inner.last_activity_wall = OffsetDateTime::now_utc();
        *self.last_activity_monotonic.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity_monotonic.lock().elapsed()
    }

    fn require_live(&self) -> MemoryResult<()> {
        if self.is_quarantined() {
            return Err(MemoryError::SessionQuarantined(self.id.clone()));
        }
        Ok(())
    }

    /// Append a message to the active layer. Never fails unless the
    /// session has been quarantined; never invokes the embedding or LLM
    /// collaborator.
    pub fn add_message(&self, role: Role, content: String, metadata: Option<Metadata>) -> MemoryResult<u64> {
        self.require_live()?;
        let mut inner = self.inner.lock();
        let id = inner.next_message_id;
        inner.next_message_id += 1;
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        let mut message = Message::new(id, sequence, role, content);
        if let Some(meta) = metadata {
            message.metadata = meta;
        }
        inner.message_count += 1;

        let outcome = inner.layers.add_active(message);
        self.touch_activity(&mut inner);
        drop(inner);

        self.persist_messages()?;
        if !outcome.enqueued_for_compression.is_empty() {
            tracing::debug!(
                session_id = %self.id,
                count = outcome.enqueued_for_compression.len(),
                "messages enqueued for compression"
            );
        }
        Ok(id)
    }

    fn persist_messages(&self) -> MemoryResult<()> {
        let inner = self.inner.lock();
        let active: Vec<Message> = inner.layers.active_messages().cloned().collect();
        let short: Vec<Message> = inner.layers.short_term_messages().cloned().collect();
        drop(inner);
        let envelope = self.envelope.lock();
        self.storage
            .write_messages(envelope.as_ref(), &[active, short].concat())
    }

    pub fn get_recent(&self, n: usize) -> Vec<Message> {
        let mut inner = self.inner.lock();
        let result = inner.layers.get_recent(n);
        self.touch_activity(&mut inner);
        result
    }

    /// Ranked semantic query across whichever layers are requested.
    pub async fn query(
        &self,
        query_text: &str,
        layers: Option<Vec<Layer>>,
        k: usize,
        embedder: &dyn Embedder,
    ) -> MemoryResult<Vec<QueryResult>> {
        self.require_live()?;
        let layers = layers.unwrap_or_else(default_query_layers);
        let include_active = layers.contains(&Layer::Active);
        let include_short = layers.contains(&Layer::ShortTerm);

        // Tie-break key alongside each result: the numeric id for the
        // string `result_id`, so ties sort by id *value* rather than by
        // lexicographic string order (where "10" < "9").
        let mut results: Vec<(QueryResult, u64)> = Vec::new();

        {
            let mut inner = self.inner.lock();
            if include_active || include_short {
                for m in inner.layers.linear_scan(query_text, include_active, include_short) {
                    results.push((
                        QueryResult {
                            layer: m.layer,
                            result_id: m.id.to_string(),
                            content: m.content.clone(),
                            score: 1.0,
                        },
                        m.id,
                    ));
                }
            }
            self.touch_activity(&mut inner);
        }

        let vector_layers: Vec<Layer> = layers
            .into_iter()
            .filter(|l| matches!(l, Layer::MediumTerm | Layer::LongTerm | Layer::Archived))
            .collect();

        if !vector_layers.is_empty() {
            let query_embedding = embedder.embed(query_text).await?;
            let now = OffsetDateTime::now_utc();
            for layer in vector_layers {
                for (summary_id, similarity) in self.vector_index.knn(layer, &query_embedding, k) {
                    let Some(record) = self.vector_index.get(layer, &summary_id) else {
                        continue;
                    };
                    let age_days = (now - record.oldest_source_at).whole_days().max(0) as f32;
                    let recency_boost = self.config.vector.recency_boost / (1.0 + age_days);
                    // Summary ids are minted as "{session_id}-{seq}"
                    // (`next_summary_id`); the trailing segment is the
                    // monotonic sequence number, usable as a numeric key.
                    let seq = summary_id
                        .rsplit_once('-')
                        .and_then(|(_, s)| s.parse::<u64>().ok())
                        .unwrap_or(0);
                    results.push((
                        QueryResult {
                            layer,
                            result_id: summary_id,
                            content: record.content,
                            score: similarity + recency_boost,
                        },
                        seq,
                    ));
                }
            }
        }

        results.sort_by(|(a, a_key), (b, b_key)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.layer.rank().cmp(&a.layer.rank()))
                .then_with(|| b_key.cmp(a_key))
        });
        results.truncate(k);
        Ok(results.into_iter().map(|(r, _)| r).collect())
    }

    pub fn create_bookmark(
        &self,
        label: String,
        description: String,
        tags: HashSet<String>,
        importance: f32,
        message_ids: Vec<u64>,
    ) -> MemoryResult<String> {
        let id = self
            .bookmarks
            .create(label, description, tags, importance, message_ids)?;
        self.persist_bookmarks()?;
        Ok(id)
    }

    fn persist_bookmarks(&self) -> MemoryResult<()> {
        let bookmarks = self.bookmarks.list();
        let envelope = self.envelope.lock();
        self.storage.write_bookmarks(envelope.as_ref(), &bookmarks)
    }

    pub fn list_bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.list()
    }

    /// Resolve a bookmark's referenced messages/summaries plus `window`
    /// neighbors from their owning layer.
    pub fn get_bookmark_context(&self, bookmark_id: &str, window: usize) -> MemoryResult<Vec<QueryResult>> {
        let bookmark = self
            .bookmarks
            .get(bookmark_id)
            .ok_or_else(|| MemoryError::NotFound(bookmark_id.to_string()))?;

        let mut out = Vec::new();
        let inner = self.inner.lock();
        for message_id in &bookmark.message_ids {
            if let Some(layer) = inner.layers.layer_of(*message_id) {
                let pool: Vec<&Message> = match layer {
                    Layer::Active => inner.layers.active_messages().collect(),
                    Layer::ShortTerm => inner.layers.short_term_messages().collect(),
                    _ => Vec::new(),
                };
                if let Some(idx) = pool.iter().position(|m| m.id == *message_id) {
                    let lo = idx.saturating_sub(window);
                    let hi = (idx + window + 1).min(pool.len());
                    for m in &pool[lo..hi] {
                        out.push(QueryResult {
                            layer: m.layer,
                            result_id: m.id.to_string(),
                            content: m.content.clone(),
                            score: 1.0,
                        });
                    }
                    continue;
                }
            }
            // Not in active/short_term: resolve via the summary record that
            // references it, in whichever vector-indexed layer holds it.
            for layer in [Layer::MediumTerm, Layer::LongTerm, Layer::Archived] {
                let mut records = self.vector_index.iterate(layer);
                records.sort_by_key(|r| r.oldest_source_at);
                if let Some(idx) = records
                    .iter()
                    .position(|r| r.source_message_ids.contains(message_id))
                {
                    let lo = idx.saturating_sub(window);
                    let hi = (idx + window + 1).min(records.len());
                    for r in &records[lo..hi] {
                        out.push(QueryResult {
                            layer,
                            result_id: r.id.clone(),
                            content: r.content.clone(),
                            score: 1.0,
                        });
                    }
                    break;
                }
            }
        }
        Ok(out)
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock();
        SessionStats {
            active: inner.layers.active_len(),
            short_term: inner.layers.short_term_len(),
            medium_term: self.vector_index.len(Layer::MediumTerm),
            long_term: self.vector_index.len(Layer::LongTerm),
            archived: self.vector_index.len(Layer::Archived),
            compression_queue: inner.layers.compression_queue_len(),
            dead_letter: inner.layers.dead_letter_len(),
            bookmarks: self.bookmarks.len(),
            message_count: inner.message_count,
            summary_count: inner.summary_count,
            last_compression_tick: inner.last_compression_tick,
        }
    }

    /// Drop messages from the given layer, or every layer when `None`. Key
    /// material is preserved.
    pub fn clear(&self, layer: Option<Layer>) -> MemoryResult<()> {
        let vector_layers = match layer {
            Some(Layer::MediumTerm) => vec![Layer::MediumTerm],
            Some(Layer::LongTerm) => vec![Layer::LongTerm],
            Some(Layer::Archived) => vec![Layer::Archived],
            None => vec![Layer::MediumTerm, Layer::LongTerm, Layer::Archived],
            Some(Layer::Active) | Some(Layer::ShortTerm) | Some(Layer::Deleted) => Vec::new(),
        };
        for l in vector_layers {
            for record in self.vector_index.iterate(l) {
                self.storage.delete_summary(l, &record.id)?;
            }
            self.vector_index.drop_layer(l);
        }

        let mut inner = self.inner.lock();
        match layer {
            Some(Layer::Active) => inner.layers.clear_active(),
            Some(Layer::ShortTerm) => inner.layers.clear_short_term(),
            None => {
                inner.layers.clear_active();
                inner.layers.clear_short_term();
            }
            _ => {}
        }
        drop(inner);
        self.persist_messages()?;
        self.refresh_bookmark_orphans();
        Ok(())
    }

    fn refresh_bookmark_orphans(&self) {
        let inner = self.inner.lock();
        let mut live = inner.layers.live_ids();
        drop(inner);
        for layer in [Layer::MediumTerm, Layer::LongTerm, Layer::Archived] {
            for record in self.vector_index.iterate(layer) {
                live.extend(record.source_message_ids.iter().copied());
            }
        }
        self.bookmarks.refresh_orphans(&live);
    }

    // -- scheduler-facing API --------------------------------------------

    pub(crate) fn drain_compression_batch(&self, batch_size: usize) -> Option<CompressionBatch> {
        let mut inner = self.inner.lock();
        inner.layers.drain_compression_batch(batch_size)
    }

    pub(crate) fn requeue_front(&self, batch: CompressionBatch) {
        let mut inner = self.inner.lock();
        inner.layers.requeue_front(batch);
    }

    pub(crate) fn park_dead_letter(&self, batch: CompressionBatch) {
        let mut inner = self.inner.lock();
        inner.layers.park_dead_letter(batch);
    }

    pub(crate) fn next_summary_id(&self) -> String {
        let seq = self.next_summary_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.id, seq)
    }

    /// Ingest a freshly-produced summary into the target layer, persist it,
    /// and report whether the target layer now exceeds its capacity (the
    /// scheduler cascades promotion to the next layer when this is true).
    pub(crate) fn ingest_summary(
        &self,
        output: SummarizationOutput,
        level: SummaryLevel,
        embedding: Vec<f32>,
        target: Layer,
        oldest_source_at: OffsetDateTime,
    ) -> MemoryResult<bool> {
        let record = SummaryRecord::new(
            self.next_summary_id(),
            output.references,
            level,
            output.content,
            output.entities,
            oldest_source_at,
        );
        {
            let envelope = self.envelope.lock();
            self.storage.write_summary(envelope.as_ref(), target, &record, &embedding)?;
        }
        self.vector_index.upsert(target, record, embedding);
        {
            let mut inner = self.inner.lock();
            inner.summary_count += 1;
            inner.last_compression_tick = Some(OffsetDateTime::now_utc());
        }
        self.refresh_bookmark_orphans();

        let capacity = match target {
            Layer::MediumTerm => self.config.layers.medium_term_max,
            Layer::LongTerm => self.config.layers.long_term_max,
            Layer::Archived => usize::MAX,
            _ => usize::MAX,
        };
        Ok(self.vector_index.len(target) > capacity)
    }

    /// Move the oldest record(s) of an overflowing layer forward to the
    /// next layer unchanged (no further content recompression, only a
    /// storage relocation — see DESIGN.md for the rationale).
    pub(crate) fn cascade_oldest(&self, from: Layer) -> MemoryResult<()> {
        let Some(to) = from.next() else {
            return Ok(());
        };
        let mut records = self.vector_index.iterate(from);
        records.sort_by_key(|r| r.oldest_source_at);
        let Some(oldest) = records.into_iter().next() else {
            return Ok(());
        };
        let Some((oldest, embedding)) = self.vector_index.get_with_embedding(from, &oldest.id) else {
            return Ok(());
        };

        self.vector_index.delete(from, &oldest.id);
        self.storage.delete_summary(from, &oldest.id)?;

        {
            let envelope = self.envelope.lock();
            self.storage.write_summary(envelope.as_ref(), to, &oldest, &embedding)?;
        }
        self.vector_index.upsert(to, oldest, embedding);
        Ok(())
    }

    // -- snapshot export/import -------------------------------------------

    /// Export the full session to a sealed container written at `path`.
    pub fn save_snapshot(&self, path: &std::path::Path) -> MemoryResult<()> {
        let bytes = self.export_snapshot()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Replace this session's entire state from a sealed container
    /// previously written by [`Session::save_snapshot`].
    pub fn load_snapshot(&self, path: &std::path::Path) -> MemoryResult<()> {
        let bytes = std::fs::read(path)?;
        self.import_snapshot(&bytes)
    }

    /// Export the full session (every layer, every bookmark) into the
    /// self-describing container format. Encrypted sessions export an
    /// encrypted container keyed by the session's own live envelope.
    fn export_snapshot(&self) -> MemoryResult<Vec<u8>> {
        let (active, short_term) = {
            let inner = self.inner.lock();
            (
                inner.layers.active_messages().cloned().collect(),
                inner.layers.short_term_messages().cloned().collect(),
            )
        };
        let contents = crate::snapshot::SnapshotContents {
            metadata: crate::snapshot::SnapshotMetadata {
                session_id: self.id.clone(),
                project_type: self.project_type,
                created_at: self.created_at,
                exported_at: OffsetDateTime::now_utc(),
            },
            active,
            short_term,
            medium_term: self.vector_index.iterate_with_embeddings(Layer::MediumTerm),
            long_term: self.vector_index.iterate_with_embeddings(Layer::LongTerm),
            archived: self.vector_index.iterate_with_embeddings(Layer::Archived),
            bookmarks: self.bookmarks.list(),
        };

        let envelope = self.envelope.lock();
        let salt = if self.encrypted {
            Some(self.storage.read_salt()?)
        } else {
            None
        };
        crate::snapshot::encode(&contents, envelope.as_ref(), salt.as_deref())
    }

    /// Replace this session's entire in-RAM state (and persist it) from a
    /// previously exported snapshot. The snapshot's own session id is
    /// ignored; it is imported into *this* session.
    fn import_snapshot(&self, bytes: &[u8]) -> MemoryResult<()> {
        let header = crate::snapshot::read_header(bytes)?;
        if header.encrypted != self.encrypted {
            return Err(MemoryError::InvalidArgument(
                "snapshot encryption mode does not match this session".to_string(),
            ));
        }
        let envelope = self.envelope.lock();
        let contents = crate::snapshot::decode(bytes, &header, envelope.as_ref(), &self.id)?;
        drop(envelope);

        for layer in [Layer::MediumTerm, Layer::LongTerm, Layer::Archived] {
            for record in self.vector_index.iterate(layer) {
                self.storage.delete_summary(layer, &record.id)?;
            }
            self.vector_index.drop_layer(layer);
        }
        for (record, embedding) in contents.medium_term {
            self.vector_index.upsert(Layer::MediumTerm, record, embedding);
        }
        for (record, embedding) in contents.long_term {
            self.vector_index.upsert(Layer::LongTerm, record, embedding);
        }
        for (record, embedding) in contents.archived {
            self.vector_index.upsert(Layer::Archived, record, embedding);
        }

        {
            let mut inner = self.inner.lock();
            let max_id = contents
                .active
                .iter()
                .chain(contents.short_term.iter())
                .map(|m| m.id)
                .max();
            let max_sequence = contents
                .active
                .iter()
                .chain(contents.short_term.iter())
                .map(|m| m.sequence)
                .max();
            inner.next_message_id = max_id.map(|m| m + 1).unwrap_or(0);
            inner.next_sequence = max_sequence.map(|s| s + 1).unwrap_or(0);
            inner.message_count = (contents.active.len() + contents.short_term.len()) as u64;
            inner.layers.restore(contents.active, contents.short_term);
        }

        {
            let envelope = self.envelope.lock();
            self.storage.write_bookmarks(envelope.as_ref(), &contents.bookmarks)?;
        }
        self.bookmarks.clear();
        for bookmark in contents.bookmarks {
            self.bookmarks.restore(bookmark);
        }

        self.persist_messages()?;
        self.refresh_bookmark_orphans();
        Ok(())
    }

    // -- crypto-shredding --------------------------------------------------

    /// Destroy the session's wrapped key in memory and remove the salt
    /// file, rendering every encrypted on-disk record irrecoverable.
    pub(crate) fn shred_key(&self) -> MemoryResult<()> {
        let mut guard = self.envelope.lock();
        if let Some(env) = guard.as_mut() {
            env.shred();
        }
        *guard = None;
        drop(guard);
        self.storage.remove_salt()?;
        self.quarantine("key shredded");
        Ok(())
    }

    pub(crate) fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    pub(crate) fn config_long_term_max(&self) -> usize {
        self.config.layers.long_term_max
    }
}

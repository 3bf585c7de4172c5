//! In-RAM containers for the active and short-term layers, and the
//! promotion primitives that move messages between tiers.
//!
//! Medium/long/archived tiers are not modeled here: they are backed
//! directly by the session's [`crate::vector::VectorIndex`], which already
//! partitions by layer.

use crate::config::LayerCapacities;
use crate::message::{Layer, Message};
use std::collections::{HashSet, VecDeque};

/// A batch of messages pulled from short_term, waiting on (or retried by)
/// the compression scheduler.
#[derive(Debug, Clone)]
pub struct CompressionBatch {
    pub messages: Vec<Message>,
    pub attempts: u32,
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Active + short-term RAM layers, plus the compression queue and its
/// dead-letter sub-queue.
pub struct LayerStore {
    active: VecDeque<Message>,
    short_term: VecDeque<Message>,
    short_term_keyword_index: std::collections::HashMap<String, HashSet<u64>>,
    compression_queue: VecDeque<Message>,
    dead_letter: Vec<CompressionBatch>,
    capacities: LayerCapacities,
}

/// Result of appending a message: what was synchronously promoted, split
/// out so the caller (the `Session`) can decide what to enqueue for
/// compression without blocking on it.
pub struct AddOutcome {
    /// Messages moved active -> short_term as part of this add.
    pub promoted_to_short: Vec<Message>,
    /// Messages moved short_term -> compression queue as part of this add.
    pub enqueued_for_compression: Vec<Message>,
}

impl LayerStore {
    pub fn new(capacities: LayerCapacities) -> Self {
        Self {
            active: VecDeque::new(),
            short_term: VecDeque::new(),
            short_term_keyword_index: std::collections::HashMap::new(),
            compression_queue: VecDeque::new(),
            dead_letter: Vec::new(),
            capacities,
        }
    }

    /// Append to active; cascade promotion if thresholds trip. O(1)
    /// amortized, O(k) worst case across simultaneous threshold trips.
    pub fn add_active(&mut self, message: Message) -> AddOutcome {
        self.active.push_back(message);

        let mut promoted_to_short = Vec::new();
        while self.active.len() > self.capacities.active_max {
            let mut oldest = self.active.pop_front().expect("active just overflowed");
            oldest.layer = Layer::ShortTerm;
            self.index_short_term(&oldest);
            self.short_term.push_back(oldest.clone());
            promoted_to_short.push(oldest);
        }

        let mut enqueued_for_compression = Vec::new();
        while self.short_term.len() > self.capacities.short_term_max {
            let oldest = self.short_term.pop_front().expect("short_term just overflowed");
            self.deindex_short_term(&oldest);
            self.compression_queue.push_back(oldest.clone());
            enqueued_for_compression.push(oldest);
        }

        AddOutcome {
            promoted_to_short,
            enqueued_for_compression,
        }
    }

    fn index_short_term(&mut self, message: &Message) {
        for word in tokenize(&message.content) {
            self.short_term_keyword_index.entry(word).or_default().insert(message.id);
        }
    }

    fn deindex_short_term(&mut self, message: &Message) {
        for word in tokenize(&message.content) {
            if let Some(ids) = self.short_term_keyword_index.get_mut(&word) {
                ids.remove(&message.id);
                if ids.is_empty() {
                    self.short_term_keyword_index.remove(&word);
                }
            }
        }
    }

    /// Last `n` messages from active + short_term, reverse-chronological.
    pub fn get_recent(&self, n: usize) -> Vec<Message> {
        let mut combined: Vec<&Message> = self.short_term.iter().chain(self.active.iter()).collect();
        combined.sort_by_key(|m| m.sequence);
        combined
            .into_iter()
            .rev()
            .take(n)
            .cloned()
            .collect()
    }

    /// Linear scan over active and/or short_term for a query substring,
    /// using the keyword index to narrow short_term candidates first.
    pub fn linear_scan(&self, query_text: &str, include_active: bool, include_short: bool) -> Vec<Message> {
        let mut out = Vec::new();
        if include_active {
            out.extend(
                self.active
                    .iter()
                    .filter(|m| m.content.to_lowercase().contains(&query_text.to_lowercase()))
                    .cloned(),
            );
        }
        if include_short {
            let words: Vec<String> = tokenize(query_text).collect();
            let mut candidate_ids: HashSet<u64> = HashSet::new();
            for w in &words {
                if let Some(ids) = self.short_term_keyword_index.get(w) {
                    candidate_ids.extend(ids.iter().copied());
                }
            }
            out.extend(
                self.short_term
                    .iter()
                    .filter(|m| candidate_ids.contains(&m.id))
                    .cloned(),
            );
        }
        out
    }

    /// Pull up to `n` oldest short_term messages directly into the
    /// compression queue (used by the scheduler to keep draining once the
    /// synchronous add-path cascade has already run).
    pub fn enqueue_for_compression(&mut self, n: usize) -> Vec<Message> {
        let mut drained = Vec::new();
        for _ in 0..n {
            let Some(oldest) = self.short_term.pop_front() else {
                break;
            };
            self.deindex_short_term(&oldest);
            drained.push(oldest);
        }
        for m in &drained {
            self.compression_queue.push_back(m.clone());
        }
        drained
    }

    /// Drain up to `batch_size` oldest messages from the compression queue
    /// for the scheduler to summarize. Visibility transfers immediately:
    /// the messages are no longer in short_term nor in the queue once
    /// drained, so they are never visible in two places at once.
    pub fn drain_compression_batch(&mut self, batch_size: usize) -> Option<CompressionBatch> {
        if self.compression_queue.is_empty() {
            return None;
        }
        let mut messages = Vec::new();
        for _ in 0..batch_size {
            let Some(m) = self.compression_queue.pop_front() else {
                break;
            };
            messages.push(m);
        }
        Some(CompressionBatch { messages, attempts: 0 })
    }

    /// Return a failed batch to the dead-letter queue after exhausting
    /// retries.
    pub fn park_dead_letter(&mut self, batch: CompressionBatch) {
        self.dead_letter.push(batch);
    }

    pub fn requeue_front(&mut self, batch: CompressionBatch) {
        for m in batch.messages.into_iter().rev() {
            self.compression_queue.push_front(m);
        }
    }

    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
        self.short_term_keyword_index.clear();
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn short_term_len(&self) -> usize {
        self.short_term.len()
    }

    pub fn compression_queue_len(&self) -> usize {
        self.compression_queue.len()
    }

    pub fn dead_letter_len(&self) -> usize {
        self.dead_letter.len()
    }

    pub fn active_messages(&self) -> impl Iterator<Item = &Message> {
        self.active.iter()
    }

    pub fn short_term_messages(&self) -> impl Iterator<Item = &Message> {
        self.short_term.iter()
    }

    /// Rehydrate active/short_term state from a previously persisted
    /// snapshot (used when reopening a session). Messages must already
    /// carry the correct `layer` tag.
    pub fn restore(&mut self, active: Vec<Message>, short_term: Vec<Message>) {
        self.active = active.into();
        self.short_term = VecDeque::new();
        self.short_term_keyword_index.clear();
        for m in short_term {
            self.index_short_term(&m);
            self.short_term.push_back(m);
        }
    }

    /// All ids currently live in active or short_term, used to refresh
    /// bookmark orphan status together with the vector index's ids.
    pub fn live_ids(&self) -> HashSet<u64> {
        self.active
            .iter()
            .chain(self.short_term.iter())
            .map(|m| m.id)
            .collect()
    }

    pub fn layer_of(&self, message_id: u64) -> Option<Layer> {
        if self.active.iter().any(|m| m.id == message_id) {
            Some(Layer::Active)
        } else if self.short_term.iter().any(|m| m.id == message_id) {
            Some(Layer::ShortTerm)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn msg(id: u64) -> Message {
        Message::new(id, id, Role::User, format!("msg-{id}"))
    }

    #[test]
    fn eleventh_message_promotes_exactly_one() {
        let mut store = LayerStore::new(LayerCapacities::default());
        for i in 0..10 {
            let outcome = store.add_active(msg(i));
            assert!(outcome.promoted_to_short.is_empty());
        }
        let outcome = store.add_active(msg(10));
        assert_eq!(outcome.promoted_to_short.len(), 1);
        assert_eq!(store.active_len(), 10);
        assert_eq!(store.short_term_len(), 1);
    }

    #[test]
    fn fifty_first_short_term_message_enqueues_one_for_compression() {
        let mut store = LayerStore::new(LayerCapacities::default());
        for i in 0..60 {
            store.add_active(msg(i));
        }
        // 60 adds: 10 active, 50 short_term would be the boundary; the 61st
        // add pushes one into compression.
        assert_eq!(store.active_len(), 10);
        assert_eq!(store.short_term_len(), 50);
        assert_eq!(store.compression_queue_len(), 0);

        let outcome = store.add_active(msg(60));
        assert_eq!(outcome.enqueued_for_compression.len(), 1);
        assert_eq!(store.compression_queue_len(), 1);
        assert_eq!(store.short_term_len(), 50);
    }

    #[test]
    fn cascade_promotion_matches_scenario_one() {
        let mut store = LayerStore::new(LayerCapacities::default());
        for i in 0..60 {
            store.add_active(msg(i));
        }
        assert_eq!(store.active_len(), 10);
        assert_eq!(store.short_term_len(), 40);
        assert_eq!(store.compression_queue_len(), 10);
    }

    #[test]
    fn get_recent_is_reverse_chronological() {
        let mut store = LayerStore::new(LayerCapacities::default());
        for i in 0..5 {
            store.add_active(msg(i));
        }
        let recent = store.get_recent(3);
        let ids: Vec<u64> = recent.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn no_message_visible_in_two_layers_at_once() {
        let mut store = LayerStore::new(LayerCapacities::default());
        for i in 0..11 {
            store.add_active(msg(i));
        }
        let active_ids: HashSet<u64> = store.active_messages().map(|m| m.id).collect();
        let short_ids: HashSet<u64> = store.short_term_messages().map(|m| m.id).collect();
        assert!(active_ids.is_disjoint(&short_ids));
    }
}

//! Embedding-indexed storage for summary records, partitioned by layer tier,
//! with approximate (here: exact, brute-force) kNN.
//!
//! Hidden behind the [`VectorIndex`] trait so a more sophisticated
//! approximate structure can be swapped in later without the `Session`
//! layer noticing, per the specification's pluggability design note.

use crate::message::Layer;
use crate::summary::SummaryRecord;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A (summary id, similarity) pair. Similarity is cosine similarity in
/// `[-1.0, 1.0]`; higher is closer.
pub type ScoredSummary = (String, f32);

/// Storage and search over one session's summary records, partitioned by
/// layer. Implementations must support read-during-write on a single layer.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, layer: Layer, record: SummaryRecord, embedding: Vec<f32>);
    fn delete(&self, layer: Layer, summary_id: &str) -> Option<SummaryRecord>;
    fn knn(&self, layer: Layer, query_embedding: &[f32], k: usize) -> Vec<ScoredSummary>;
    fn get(&self, layer: Layer, summary_id: &str) -> Option<SummaryRecord>;
    fn get_with_embedding(&self, layer: Layer, summary_id: &str) -> Option<(SummaryRecord, Vec<f32>)>;
    fn iterate(&self, layer: Layer) -> Vec<SummaryRecord>;
    fn iterate_with_embeddings(&self, layer: Layer) -> Vec<(SummaryRecord, Vec<f32>)>;
    fn drop_layer(&self, layer: Layer);
    fn len(&self, layer: Layer) -> usize;
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MIN;
    }
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

struct Entry {
    record: SummaryRecord,
    embedding: Vec<f32>,
}

/// Linear-scan cosine-similarity index. Correct for any corpus size; the
/// spec's approximate-structure escape hatch is only needed past ~10k
/// records per layer, which this crate does not target by default.
#[derive(Default)]
pub struct BruteForceIndex {
    layers: RwLock<HashMap<Layer, HashMap<String, Entry>>>,
}

impl BruteForceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for BruteForceIndex {
    fn upsert(&self, layer: Layer, record: SummaryRecord, embedding: Vec<f32>) {
        let mut layers = self.layers.write();
        layers
            .entry(layer)
            .or_default()
            .insert(record.id.clone(), Entry { record, embedding });
    }

    fn delete(&self, layer: Layer, summary_id: &str) -> Option<SummaryRecord> {
        let mut layers = self.layers.write();
        layers
            .get_mut(&layer)
            .and_then(|m| m.remove(summary_id))
            .map(|e| e.record)
    }

    fn knn(&self, layer: Layer, query_embedding: &[f32], k: usize) -> Vec<ScoredSummary> {
        let layers = self.layers.read();
        let Some(entries) = layers.get(&layer) else {
            return Vec::new();
        };
        let mut scored: Vec<ScoredSummary> = entries
            .values()
            .map(|e| (e.record.id.clone(), cosine_similarity(query_embedding, &e.embedding)))
            .collect();
        scored.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(std::cmp::Ordering::Equal) | None => b.0.cmp(&a.0),
            Some(ord) => ord,
        });
        scored.truncate(k);
        scored
    }

    fn get(&self, layer: Layer, summary_id: &str) -> Option<SummaryRecord> {
        let layers = self.layers.read();
        layers
            .get(&layer)
            .and_then(|m| m.get(summary_id))
            .map(|e| e.record.clone())
    }

    fn get_with_embedding(&self, layer: Layer, summary_id: &str) -> Option<(SummaryRecord, Vec<f32>)> {
        let layers = self.layers.read();
        layers
            .get(&layer)
            .and_then(|m| m.get(summary_id))
            .map(|e| (e.record.clone(), e.embedding.clone()))
    }

    fn iterate(&self, layer: Layer) -> Vec<SummaryRecord> {
        let layers = self.layers.read();
        layers
            .get(&layer)
            .map(|m| m.values().map(|e| e.record.clone()).collect())
            .unwrap_or_default()
    }

    fn iterate_with_embeddings(&self, layer: Layer) -> Vec<(SummaryRecord, Vec<f32>)> {
        let layers = self.layers.read();
        layers
            .get(&layer)
            .map(|m| m.values().map(|e| (e.record.clone(), e.embedding.clone())).collect())
            .unwrap_or_default()
    }

    fn drop_layer(&self, layer: Layer) {
        let mut layers = self.layers.write();
        layers.remove(&layer);
    }

    fn len(&self, layer: Layer) -> usize {
        let layers = self.layers.read();
        layers.get(&layer).map(|m| m.len()).unwrap_or(0)
    }
}

//! Shared fakes for the external collaborators (embedding, summarization)
//! the engine treats as opaque. Deterministic so assertions on ranking and
//! content survive re-runs.

use async_trait::async_trait;
use hierarchical_memory::{Entity, Message, MemoryResult, SummarizationOutput, SummaryLevel};
use hierarchical_memory::{Embedder, Summarizer};

/// Embeds by hashing tokens into a small fixed-size bag-of-words vector.
/// Not a real embedding model, but cosine similarity over it still ranks a
/// summary containing a query's distinctive tokens above one that doesn't,
/// which is all these tests need.
pub struct FakeEmbedder {
    dimension: usize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

fn bucket(word: &str, dimension: usize) -> usize {
    let mut hash: u64 = 1469598103934665603;
    for b in word.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    (hash as usize) % dimension
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let mut v = vec![0f32; self.dimension];
        for word in text.split_whitespace().map(|w| w.to_lowercase()) {
            v[bucket(&word, self.dimension)] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Summarizes a batch by concatenating message content, truncated for the
/// brief level. Entities are not extracted; tests that need them build
/// `SummaryRecord`s directly instead of going through the scheduler.
pub struct FakeSummarizer;

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, messages: &[Message], target_level: SummaryLevel) -> MemoryResult<SummarizationOutput> {
        let joined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        let content = match target_level {
            SummaryLevel::Brief => joined.chars().take(80).collect(),
            _ => joined,
        };
        Ok(SummarizationOutput {
            content,
            entities: Vec::<Entity>::new(),
            references: messages.iter().map(|m| m.id).collect(),
        })
    }
}

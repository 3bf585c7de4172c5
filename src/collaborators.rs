//! The three external collaborators the engine treats as opaque
//! capabilities: embedding, text generation, and summarization. The engine
//! never assumes anything about their implementation beyond these
//! signatures.

use crate::error::MemoryResult;
use crate::message::Message;
use crate::sampling::SamplingParams;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Entity extracted from a batch of messages during summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub kind: String,
    pub salience: f32,
}

/// Output of one summarization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationOutput {
    pub content: String,
    pub entities: Vec<Entity>,
    /// Ids of the source messages this summary was derived from.
    pub references: Vec<u64>,
}

/// Compression level requested from the summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryLevel {
    /// Detailed paragraph.
    Detailed = 1,
    /// Medium-length summary.
    Medium = 2,
    /// Brief sentence.
    Brief = 3,
}

/// `embed(text) -> f32[D]`, deterministic for the session's configured
/// embedding model. `D` is fixed at session construction.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>>;

    /// The embedding dimension this collaborator produces.
    fn dimension(&self) -> usize;
}

/// `generate(prompt, sampling) -> text`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, sampling: &SamplingParams) -> MemoryResult<String>;
}

/// `summarize(messages, target_level) -> { content, entities, references }`.
/// May be implemented as a prompt template over `Generator::generate`.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        messages: &[Message],
        target_level: SummaryLevel,
    ) -> MemoryResult<SummarizationOutput>;
}

//! Configuration for every component, composed into one top-level
//! `MemoryConfig`. Each sub-config mirrors a single component's defaults
//! from the specification and is independently `Default`.

use std::time::Duration;

/// Capacity thresholds for the five layers. Counts are measured in messages
/// (active/short_term) or summary records (medium/long/archived).
#[derive(Debug, Clone)]
pub struct LayerCapacities {
    pub active_max: usize,
    pub short_term_max: usize,
    pub medium_term_max: usize,
    pub long_term_max: usize,
}

impl Default for LayerCapacities {
    fn default() -> Self {
        Self {
            active_max: 10,
            short_term_max: 50,
            medium_term_max: 200,
            long_term_max: 1000,
        }
    }
}

/// Scheduling parameters for the background compression task.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// A session becomes eligible for compression once idle this long.
    pub idle_threshold: Duration,
    /// Longer idle gate enabling medium->long re-summarization.
    pub deep_idle_threshold: Duration,
    /// Messages drained per batch.
    pub batch_min: usize,
    pub batch_max: usize,
    /// Compression queue bound (advisory, not enforced).
    pub queue_bound_multiplier: usize,
    /// Retry attempts before a batch is parked in the dead-letter queue.
    pub max_retry_attempts: u32,
    /// Base backoff between retries; doubled per attempt.
    pub retry_backoff_base: Duration,
    /// How often the scheduler tick fires.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(3),
            deep_idle_threshold: Duration::from_secs(10),
            batch_min: 10,
            batch_max: 20,
            queue_bound_multiplier: 10,
            max_retry_attempts: 3,
            retry_backoff_base: Duration::from_millis(500),
            tick_interval: Duration::from_millis(500),
        }
    }
}

/// Key-derivation and AEAD parameters for the crypto envelope. Defaults meet
/// the OWASP-recommended minimums named in the spec.
#[derive(Debug, Clone)]
pub struct CryptoConfig {
    pub argon2_time_cost: u32,
    pub argon2_memory_cost_kib: u32,
    pub argon2_parallelism: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_time_cost: 3,
            argon2_memory_cost_kib: 64 * 1024,
            argon2_parallelism: 1,
        }
    }
}

/// Vector index sizing knobs.
#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    /// Fixed embedding dimension for the session's lifetime.
    pub dimension: usize,
    /// Small additive recency boost applied during re-ranking.
    pub recency_boost: f32,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            recency_boost: 0.02,
        }
    }
}

/// Top-level configuration bundle for a `SessionManager`.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    pub layers: LayerCapacities,
    pub scheduler: SchedulerConfig,
    pub crypto: CryptoConfig,
    pub vector: VectorIndexConfig,
}

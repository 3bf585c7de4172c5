//! Summary records: the unit of storage in medium/long/archived layers,
//! produced by the compression scheduler from a batch of source messages.

use crate::collaborators::{Entity, SummaryLevel};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A compressed representation of one or more source messages. Lives only
/// in medium/long/archived layers; never promoted backward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub source_message_ids: Vec<u64>,
    pub level: SummaryLevel,
    pub content: String,
    pub entities: Vec<Entity>,
    /// Stamped with the age of the oldest source message, used as the
    /// recency-bias term in query ranking.
    #[serde(with = "time::serde::rfc3339")]
    pub oldest_source_at: OffsetDateTime,
}

impl SummaryRecord {
    pub fn new(
        id: String,
        source_message_ids: Vec<u64>,
        level: SummaryLevel,
        content: String,
        entities: Vec<Entity>,
        oldest_source_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            source_message_ids,
            level,
            content,
            entities,
            oldest_source_at,
        }
    }
}

//! The atomic unit of conversational memory, and the layer tag it migrates
//! through.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Speaker role. `Other` preserves open-endedness for roles the engine
/// doesn't special-case, without exposing runtime reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
    Narrator,
    Character,
    Director,
    Other(String),
}

impl Role {
    fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Narrator => "narrator",
            Role::Character => "character",
            Role::Director => "director",
            Role::Other(s) => s.as_str(),
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "narrator" => Role::Narrator,
            "character" => Role::Character,
            "director" => Role::Director,
            other => Role::Other(other.to_string()),
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Role::from_str(&s))
    }
}

/// Open-ended metadata value. Represents the JSON-value sum type a message's
/// free-form metadata map is valued over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<MetadataValue>),
    Object(HashMap<String, MetadataValue>),
}

/// Per-message metadata map. Append-only once attached to a message.
pub type Metadata = HashMap<String, MetadataValue>;

/// Canonical layer position. Transitions are one-directional: `Active` ->
/// `ShortTerm` -> `MediumTerm` -> `LongTerm` -> `Archived`, or to the
/// terminal `Deleted` state from anywhere.
///
/// Declared coldest-to-hottest so the derived `Ord` agrees with
/// [`Layer::rank`]: `Active > ShortTerm > ... > Archived`, with `Deleted`
/// the odd one out (ranked via `rank()`, not declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Deleted,
    Archived,
    LongTerm,
    MediumTerm,
    ShortTerm,
    Active,
}

impl Layer {
    /// Ranking used to break query-result ties: hotter layers win.
    pub fn rank(self) -> u8 {
        match self {
            Layer::Active => 4,
            Layer::ShortTerm => 3,
            Layer::MediumTerm => 2,
            Layer::LongTerm => 1,
            Layer::Archived => 0,
            Layer::Deleted => u8::MAX,
        }
    }

    /// The layer a message is promoted to when it overflows this one, if any.
    pub fn next(self) -> Option<Layer> {
        match self {
            Layer::Active => Some(Layer::ShortTerm),
            Layer::ShortTerm => Some(Layer::MediumTerm),
            Layer::MediumTerm => Some(Layer::LongTerm),
            Layer::LongTerm => Some(Layer::Archived),
            Layer::Archived | Layer::Deleted => None,
        }
    }
}

/// A single chat message. `id` is assigned once and never changes; `layer`
/// only moves forward through the canonical order; `content` is immutable
/// after insertion; `metadata` is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    /// Monotonic insertion counter, distinct from `id`, used as a
    /// chronological tiebreaker independent of any future renumbering.
    pub sequence: u64,
    pub role: Role,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub metadata: Metadata,
    pub layer: Layer,
    /// Populated only on messages materialized from a summary record that
    /// references extracted entities.
    #[serde(default)]
    pub entity_refs: Vec<String>,
}

impl Message {
    pub fn new(id: u64, sequence: u64, role: Role, content: String) -> Self {
        Self {
            id,
            sequence,
            role,
            content,
            created_at: OffsetDateTime::now_utc(),
            metadata: Metadata::new(),
            layer: Layer::Active,
            entity_refs: Vec::new(),
        }
    }
}

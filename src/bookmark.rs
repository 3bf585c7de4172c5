//! Per-session bookmark registry keyed by bookmark id. Bookmarks are purely
//! metadata: they never move the messages they reference.

use crate::error::{MemoryError, MemoryResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub label: String,
    pub description: String,
    pub tags: HashSet<String>,
    pub importance: f32,
    pub message_ids: Vec<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set when every referenced message has been deleted. The bookmark is
    /// kept (rather than cascade-deleted) so the label/description/tags
    /// remain inspectable.
    #[serde(default)]
    pub orphaned: bool,
}

/// Registry of bookmarks for one session, guarded by an internal lock so it
/// composes independently of the session's outer mutex.
#[derive(Default)]
pub struct BookmarkStore {
    bookmarks: RwLock<HashMap<String, Bookmark>>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        label: String,
        description: String,
        tags: HashSet<String>,
        importance: f32,
        message_ids: Vec<u64>,
    ) -> MemoryResult<String> {
        if message_ids.is_empty() {
            return Err(MemoryError::InvalidArgument(
                "message_ids must not be empty".to_string(),
            ));
        }
        let importance = importance.clamp(0.0, 1.0);
        let id = Uuid::new_v4().to_string();
        let bookmark = Bookmark {
            id: id.clone(),
            label,
            description,
            tags,
            importance,
            message_ids,
            created_at: OffsetDateTime::now_utc(),
            orphaned: false,
        };
        self.bookmarks.write().insert(id.clone(), bookmark);
        Ok(id)
    }

    /// Reinsert a bookmark loaded verbatim from disk (preserves its id,
    /// timestamp, and orphan flag), used when reopening a session.
    pub fn restore(&self, bookmark: Bookmark) {
        self.bookmarks.write().insert(bookmark.id.clone(), bookmark);
    }

    pub fn get(&self, id: &str) -> Option<Bookmark> {
        self.bookmarks.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Bookmark> {
        self.bookmarks.read().values().cloned().collect()
    }

    /// Mark a bookmark orphaned (all referenced messages were deleted)
    /// instead of cascade-deleting it.
    pub fn mark_orphaned(&self, id: &str) {
        if let Some(b) = self.bookmarks.write().get_mut(id) {
            b.orphaned = true;
        }
    }

    /// Recompute orphan status for every bookmark given the set of message
    /// ids still alive anywhere in the session.
    pub fn refresh_orphans(&self, live_message_ids: &HashSet<u64>) {
        let mut bookmarks = self.bookmarks.write();
        for bookmark in bookmarks.values_mut() {
            bookmark.orphaned = bookmark
                .message_ids
                .iter()
                .all(|id| !live_message_ids.contains(id));
        }
    }

    pub fn clear(&self) {
        self.bookmarks.write().clear();
    }

    pub fn len(&self) -> usize {
        self.bookmarks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.read().is_empty()
    }
}

//! Per-session on-disk layout, matching the specification's storage root:
//!
//! ```text
//! <data_root>/
//!   medical_secure/<id>/{salt, blobs/<tier>/, vectors/<tier>/, bookmarks.enc}
//!   general/<id>/{blobs/<tier>/, vectors/<tier>/, bookmarks.json}
//! ```
//!
//! Two additions beyond the spec's named files, needed for a session to
//! round-trip across a process restart: `messages.{json,enc}` persists the
//! active/short_term RAM layers, and `registry.sqlite` (owned by the
//! `SessionManager`, not here) is the durable list of known sessions.

use crate::bookmark::Bookmark;
use crate::crypto::CryptoEnvelope;
use crate::error::{MemoryError, MemoryResult};
use crate::message::{Layer, Message};
use crate::summary::SummaryRecord;
use std::fs;
use std::path::{Path, PathBuf};

pub const MEDICAL_ROOT: &str = "medical_secure";
pub const GENERAL_ROOT: &str = "general";
const SALT_FILE: &str = "salt";
const MESSAGES_PLAIN: &str = "messages.json";
const MESSAGES_ENC: &str = "messages.enc";
const BOOKMARKS_PLAIN: &str = "bookmarks.json";
const BOOKMARKS_ENC: &str = "bookmarks.enc";

/// Validate a caller-supplied session id against the spec's format:
/// UTF-8, 1-128 bytes, `[A-Za-z0-9_.-]`, and never `..` or a path separator.
pub fn validate_session_id(id: &str) -> MemoryResult<()> {
    if id.is_empty() || id.len() > 128 {
        return Err(MemoryError::InvalidArgument(
            "session id must be 1-128 bytes".to_string(),
        ));
    }
    if id == ".." || id.contains('/') || id.contains('\\') {
        return Err(MemoryError::InvalidArgument(
            "session id must not contain path separators or `..`".to_string(),
        ));
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
    {
        return Err(MemoryError::InvalidArgument(
            "session id must match [A-Za-z0-9_.-]".to_string(),
        ));
    }
    Ok(())
}

fn layer_dir_name(layer: Layer) -> &'static str {
    match layer {
        Layer::MediumTerm => "medium_term",
        Layer::LongTerm => "long_term",
        Layer::Archived => "archived",
        _ => "unknown",
    }
}

/// Filesystem access for a single session's directory.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    root: PathBuf,
    encrypted: bool,
}

impl SessionStorage {
    pub fn root_for(data_root: &Path, encrypted: bool, session_id: &str) -> PathBuf {
        let tier = if encrypted { MEDICAL_ROOT } else { GENERAL_ROOT };
        data_root.join(tier).join(session_id)
    }

    pub fn new(data_root: &Path, encrypted: bool, session_id: &str) -> Self {
        Self {
            root: Self::root_for(data_root, encrypted, session_id),
            encrypted,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn prepare(&self) -> MemoryResult<()> {
        for layer in [Layer::MediumTerm, Layer::LongTerm, Layer::Archived] {
            fs::create_dir_all(self.root.join("blobs").join(layer_dir_name(layer)))?;
            fs::create_dir_all(self.root.join("vectors").join(layer_dir_name(layer)))?;
        }
        Ok(())
    }

    pub fn remove(&self) -> MemoryResult<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    // -- salt -----------------------------------------------------------

    pub fn write_salt(&self, salt: &[u8]) -> MemoryResult<()> {
        fs::write(self.root.join(SALT_FILE), salt)?;
        Ok(())
    }

    pub fn read_salt(&self) -> MemoryResult<Vec<u8>> {
        Ok(fs::read(self.root.join(SALT_FILE))?)
    }

    pub fn remove_salt(&self) -> MemoryResult<()> {
        let path = self.root.join(SALT_FILE);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    // -- messages (active + short_term) ----------------------------------

    pub fn write_messages(
        &self,
        envelope: Option<&CryptoEnvelope>,
        messages: &[Message],
    ) -> MemoryResult<()> {
        let plaintext = serde_json::to_vec(messages)?;
        match envelope {
            Some(env) => {
                let record = env.encrypt(&plaintext, b"messages")?;
                fs::write(self.root.join(MESSAGES_ENC), record)?;
            }
            None => {
                fs::write(self.root.join(MESSAGES_PLAIN), plaintext)?;
            }
        }
        Ok(())
    }

    pub fn read_messages(&self, envelope: Option<&CryptoEnvelope>) -> MemoryResult<Vec<Message>> {
        let path = if self.encrypted {
            self.root.join(MESSAGES_ENC)
        } else {
            self.root.join(MESSAGES_PLAIN)
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(path)?;
        let plaintext = match envelope {
            Some(env) => env.decrypt(&raw, b"messages")?,
            None => raw,
        };
        Ok(serde_json::from_slice(&plaintext)?)
    }

    // -- bookmarks --------------------------------------------------------

    pub fn write_bookmarks(
        &self,
        envelope: Option<&CryptoEnvelope>,
        bookmarks: &[Bookmark],
    ) -> MemoryResult<()> {
        let plaintext = serde_json::to_vec(bookmarks)?;
        match envelope {
            Some(env) => {
                let record = env.encrypt(&plaintext, b"bookmarks")?;
                fs::write(self.root.join(BOOKMARKS_ENC), record)?;
            }
            None => {
                fs::write(self.root.join(BOOKMARKS_PLAIN), plaintext)?;
            }
        }
        Ok(())
    }

    pub fn read_bookmarks(&self, envelope: Option<&CryptoEnvelope>) -> MemoryResult<Vec<Bookmark>> {
        let path = if self.encrypted {
            self.root.join(BOOKMARKS_ENC)
        } else {
            self.root.join(BOOKMARKS_PLAIN)
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(path)?;
        let plaintext = match envelope {
            Some(env) => env.decrypt(&raw, b"bookmarks")?,
            None => raw,
        };
        Ok(serde_json::from_slice(&plaintext)?)
    }

    // -- summary records (medium/long/archived) ---------------------------

    fn summary_path(&self, layer: Layer, summary_id: &str) -> PathBuf {
        if self.encrypted {
            self.root
                .join("blobs")
                .join(layer_dir_name(layer))
                .join(format!("{summary_id}.bin"))
        } else {
            self.root
                .join("vectors")
                .join(layer_dir_name(layer))
                .join(format!("{summary_id}.json"))
        }
    }

    pub fn write_summary(
        &self,
        envelope: Option<&CryptoEnvelope>,
        layer: Layer,
        record: &SummaryRecord,
        embedding: &[f32],
    ) -> MemoryResult<()> {
        let payload = serde_json::to_vec(&(record, embedding))?;
        let path = self.summary_path(layer, &record.id);
        match envelope {
            Some(env) => {
                let enc = env.encrypt(&payload, record.id.as_bytes())?;
                fs::write(path, enc)?;
            }
            None => {
                fs::write(path, payload)?;
            }
        }
        Ok(())
    }

    pub fn delete_summary(&self, layer: Layer, summary_id: &str) -> MemoryResult<()> {
        let path = self.summary_path(layer, summary_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Load every summary record persisted for `layer`. Records that fail
    /// to decrypt are skipped and counted, not treated as fatal.
    pub fn load_layer_summaries(
        &self,
        envelope: Option<&CryptoEnvelope>,
        layer: Layer,
    ) -> MemoryResult<(Vec<(SummaryRecord, Vec<f32>)>, usize)> {
        let dir = if self.encrypted {
            self.root.join("blobs").join(layer_dir_name(layer))
        } else {
            self.root.join("vectors").join(layer_dir_name(layer))
        };
        if !dir.exists() {
            return Ok((Vec::new(), 0));
        }
        let mut out = Vec::new();
        let mut failures = 0usize;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let raw = fs::read(&path)?;
            let summary_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let plaintext = match envelope {
                Some(env) => match env.decrypt(&raw, summary_id.as_bytes()) {
                    Ok(p) => p,
                    Err(_) => {
                        failures += 1;
                        continue;
                    }
                },
                None => raw,
            };
            match serde_json::from_slice::<(SummaryRecord, Vec<f32>)>(&plaintext) {
                Ok(pair) => out.push(pair),
                Err(_) => failures += 1,
            }
        }
        Ok((out, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dotdot_and_separators() {
        assert!(validate_session_id("..").is_err());
        assert!(validate_session_id("a/b").is_err());
        assert!(validate_session_id("a\\b").is_err());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id(&"a".repeat(129)).is_err());
    }

    #[test]
    fn accepts_well_formed_ids() {
        assert!(validate_session_id("session-1_2.3").is_ok());
    }

    #[test]
    fn root_selected_by_encryption_flag() {
        let data_root = Path::new("/tmp/data");
        assert_eq!(
            SessionStorage::root_for(data_root, true, "s1"),
            data_root.join(MEDICAL_ROOT).join("s1")
        );
        assert_eq!(
            SessionStorage::root_for(data_root, false, "s1"),
            data_root.join(GENERAL_ROOT).join("s1")
        );
    }
}

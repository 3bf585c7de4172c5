//! Self-describing export/import container for one session's full state.
//!
//! Layout:
//!
//! ```text
//! magic        4 bytes   b"AUNX"
//! version      4 bytes   u32 LE
//! encrypted    1 byte    0 or 1
//! [salt_len    4 bytes   u32 LE]   \ only present when encrypted
//! [salt        salt_len] /
//! payload_len  8 bytes   u64 LE
//! payload      payload_len bytes   JSON, AEAD-encrypted iff `encrypted`
//! ```
//!
//! The salt is stored outside the encrypted payload so a caller can derive
//! the envelope before attempting to decode anything encrypted.

use crate::bookmark::Bookmark;
use crate::crypto::CryptoEnvelope;
use crate::error::{MemoryError, MemoryResult};
use crate::message::Message;
use crate::session::ProjectType;
use crate::summary::SummaryRecord;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const MAGIC: &[u8; 4] = b"AUNX";
pub const VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub session_id: String,
    pub project_type: ProjectType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
}

/// Everything needed to fully reconstruct a session's layers and bookmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotContents {
    pub metadata: SnapshotMetadata,
    pub active: Vec<Message>,
    pub short_term: Vec<Message>,
    pub medium_term: Vec<(SummaryRecord, Vec<f32>)>,
    pub long_term: Vec<(SummaryRecord, Vec<f32>)>,
    pub archived: Vec<(SummaryRecord, Vec<f32>)>,
    pub bookmarks: Vec<Bookmark>,
}

/// Header fields read without needing a passphrase, so the caller can
/// derive the envelope before decoding the (possibly encrypted) payload.
pub struct SnapshotHeader {
    pub encrypted: bool,
    pub salt: Option<Vec<u8>>,
    payload_offset: usize,
}

fn read_u32(bytes: &[u8], at: usize) -> MemoryResult<u32> {
    let slice = bytes
        .get(at..at + 4)
        .ok_or_else(|| MemoryError::StorageError("snapshot truncated".to_string()))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_u64(bytes: &[u8], at: usize) -> MemoryResult<u64> {
    let slice = bytes
        .get(at..at + 8)
        .ok_or_else(|| MemoryError::StorageError("snapshot truncated".to_string()))?;
    Ok(u64::from_le_bytes(slice.try_into().unwrap()))
}

pub fn read_header(bytes: &[u8]) -> MemoryResult<SnapshotHeader> {
    if bytes.len() < 9 || &bytes[0..4] != MAGIC {
        return Err(MemoryError::StorageError("not a valid snapshot".to_string()));
    }
    let version = read_u32(bytes, 4)?;
    if version != VERSION {
        return Err(MemoryError::StorageError(format!("unsupported snapshot version {version}")));
    }
    let encrypted = bytes[8] != 0;
    let mut offset = 9;
    let salt = if encrypted {
        let salt_len = read_u32(bytes, offset)? as usize;
        offset += 4;
        let salt = bytes
            .get(offset..offset + salt_len)
            .ok_or_else(|| MemoryError::StorageError("snapshot truncated".to_string()))?
            .to_vec();
        offset += salt_len;
        Some(salt)
    } else {
        None
    };
    Ok(SnapshotHeader {
        encrypted,
        salt,
        payload_offset: offset,
    })
}

/// Encode a full snapshot. `salt` must be `Some` iff `envelope` is `Some`.
pub fn encode(
    contents: &SnapshotContents,
    envelope: Option<&CryptoEnvelope>,
    salt: Option<&[u8]>,
) -> MemoryResult<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.push(envelope.is_some() as u8);
    if let Some(salt) = salt {
        out.extend_from_slice(&(salt.len() as u32).to_le_bytes());
        out.extend_from_slice(salt);
    }

    let plaintext = serde_json::to_vec(contents)?;
    let payload = match envelope {
        Some(env) => env.encrypt(&plaintext, contents.metadata.session_id.as_bytes())?,
        None => plaintext,
    };
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode the payload given a header already read from the same bytes and
/// (for encrypted snapshots) an envelope derived from its salt.
pub fn decode(bytes: &[u8], header: &SnapshotHeader, envelope: Option<&CryptoEnvelope>, session_id: &str) -> MemoryResult<SnapshotContents> {
    let payload_len = read_u64(bytes, header.payload_offset)? as usize;
    let payload_start = header.payload_offset + 8;
    let payload = bytes
        .get(payload_start..payload_start + payload_len)
        .ok_or_else(|| MemoryError::StorageError("snapshot truncated".to_string()))?;

    let plaintext = match envelope {
        Some(env) => env.decrypt(payload, session_id.as_bytes())?,
        None => payload.to_vec(),
    };
    Ok(serde_json::from_slice(&plaintext)?)
}

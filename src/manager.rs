//! `SessionManager`: the durable registry of sessions, and the only entry
//! point that creates, opens, lists, or deletes them.
//!
//! The registry itself lives in a small sqlite database (`registry.sqlite`)
//! accessed through `tokio::task::spawn_blocking`, mirroring how this crate's
//! ancestor keeps a blocking `rusqlite::Connection` off the async executor.

use crate::collaborators::{Embedder, Summarizer};
use crate::config::MemoryConfig;
use crate::crypto::{generate_salt, CryptoEnvelope};
use crate::error::{MemoryError, MemoryResult, SessionDeletionFailure};
use crate::scheduler::{CompressionScheduler, SessionRegistry};
use crate::session::{ProjectType, Session, SessionDescriptor, SessionStats};
use crate::storage::{validate_session_id, SessionStorage};
use parking_lot::Mutex as SyncMutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

/// The literal confirmation phrase `delete_all_medical` requires, guarding
/// against an accidental bulk wipe.
pub const MEDICAL_DELETION_CONFIRMATION: &str = "DELETE_ALL_MEDICAL_DATA";

struct Registry {
    conn: SyncMutex<Connection>,
}

impl Registry {
    fn open(path: &Path) -> MemoryResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                project_type TEXT NOT NULL,
                encrypted INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: SyncMutex::new(conn),
        })
    }

    fn insert(&self, id: &str, project_type: ProjectType, encrypted: bool, created_at: OffsetDateTime) -> MemoryResult<()> {
        self.conn.lock().execute(
            "INSERT INTO sessions (id, project_type, encrypted, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                id,
                project_type.as_str(),
                encrypted as i64,
                created_at
                    .format(&time::format_description::well_known::Rfc3339)
                    .map_err(|e| MemoryError::StorageError(e.to_string()))?
            ],
        )?;
        Ok(())
    }

    fn remove(&self, id: &str) -> MemoryResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM sessions WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
    }

    fn get(&self, id: &str) -> MemoryResult<Option<(ProjectType, bool, OffsetDateTime)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT project_type, encrypted, created_at FROM sessions WHERE id = ?1")?;
        let mut rows = stmt.query(rusqlite::params![id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let project_type: String = row.get(0)?;
        let encrypted: i64 = row.get(1)?;
        let created_at: String = row.get(2)?;
        Ok(Some((
            parse_project_type(&project_type)?,
            encrypted != 0,
            OffsetDateTime::parse(&created_at, &time::format_description::well_known::Rfc3339)
                .map_err(|e| MemoryError::StorageError(e.to_string()))?,
        )))
    }

    fn list(&self) -> MemoryResult<Vec<(String, ProjectType, bool, OffsetDateTime)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, project_type, encrypted, created_at FROM sessions ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let project_type: String = row.get(1)?;
            let encrypted: i64 = row.get(2)?;
            let created_at: String = row.get(3)?;
            Ok((id, project_type, encrypted != 0, created_at))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, project_type, encrypted, created_at) = row?;
            out.push((
                id,
                parse_project_type(&project_type)?,
                encrypted,
                OffsetDateTime::parse(&created_at, &time::format_description::well_known::Rfc3339)
                    .map_err(|e| MemoryError::StorageError(e.to_string()))?,
            ));
        }
        Ok(out)
    }

    fn medical_ids(&self) -> MemoryResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM sessions WHERE encrypted = 1 ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn parse_project_type(s: &str) -> MemoryResult<ProjectType> {
    match s {
        "medical_peer" => Ok(ProjectType::MedicalPeer),
        "medical_assistant" => Ok(ProjectType::MedicalAssistant),
        "storytelling" => Ok(ProjectType::Storytelling),
        "general_chat" => Ok(ProjectType::GeneralChat),
        "general_assistant" => Ok(ProjectType::GeneralAssistant),
        other => Err(MemoryError::StorageError(format!("unknown project type {other}"))),
    }
}

/// Entry point for every multi-session operation: creating, opening,
/// listing, deleting sessions, and the medical bulk-deletion verb.
pub struct SessionManager {
    data_root: PathBuf,
    config: MemoryConfig,
    registry: Arc<Registry>,
    sessions: Arc<SessionRegistry>,
    scheduler: Arc<CompressionScheduler>,
    scheduler_handle: SyncMutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub async fn new(
        data_root: impl Into<PathBuf>,
        config: MemoryConfig,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
    ) -> MemoryResult<Self> {
        let data_root = data_root.into();
        let db_path = data_root.join("registry.sqlite");
        std::fs::create_dir_all(&data_root)?;
        let registry = {
            let db_path = db_path.clone();
            tokio::task::spawn_blocking(move || Registry::open(&db_path))
                .await
                .map_err(|e| MemoryError::StorageError(e.to_string()))??
        };
        let sessions: Arc<SessionRegistry> = Arc::new(parking_lot::RwLock::new(HashMap::new()));
        let scheduler = Arc::new(CompressionScheduler::new(
            config.scheduler.clone(),
            summarizer,
            embedder,
            sessions.clone(),
        ));
        Ok(Self {
            data_root,
            config,
            registry: Arc::new(registry),
            sessions,
            scheduler,
            scheduler_handle: SyncMutex::new(None),
        })
    }

    /// Start the background compression loop. Idempotent: calling twice
    /// replaces the previous handle after aborting it.
    pub fn start_scheduler(&self) {
        let mut handle = self.scheduler_handle.lock();
        if let Some(old) = handle.take() {
            old.abort();
        }
        *handle = Some(self.scheduler.clone().spawn());
    }

    pub fn stop_scheduler(&self) {
        if let Some(handle) = self.scheduler_handle.lock().take() {
            handle.abort();
        }
    }

    pub fn scheduler(&self) -> &Arc<CompressionScheduler> {
        &self.scheduler
    }

    pub async fn create_session(
        &self,
        id: impl Into<String>,
        project_type: ProjectType,
        passphrase: Option<&str>,
    ) -> MemoryResult<Arc<Session>> {
        let id = id.into();
        validate_session_id(&id)?;
        if self.sessions.read().contains_key(&id) {
            return Err(MemoryError::AlreadyExists(id));
        }
        {
            let registry = self.registry.clone();
            let check_id = id.clone();
            let exists = tokio::task::spawn_blocking(move || registry.get(&check_id))
                .await
                .map_err(|e| MemoryError::StorageError(e.to_string()))??;
            if exists.is_some() {
                return Err(MemoryError::AlreadyExists(id));
            }
        }

        let encrypted = project_type.is_medical();
        if encrypted && passphrase.is_none() {
            return Err(MemoryError::InvalidProjectType);
        }

        let storage = SessionStorage::new(&self.data_root, encrypted, &id);
        storage.prepare()?;

        let envelope = if encrypted {
            let salt = generate_salt();
            storage.write_salt(&salt)?;
            Some(CryptoEnvelope::derive(passphrase.unwrap(), &salt, &self.config.crypto)?)
        } else {
            None
        };

        let created_at = OffsetDateTime::now_utc();
        {
            let registry = self.registry.clone();
            let id = id.clone();
            tokio::task::spawn_blocking(move || registry.insert(&id, project_type, encrypted, created_at))
                .await
                .map_err(|e| MemoryError::StorageError(e.to_string()))??;
        }

        let session = Arc::new(Session::new(id.clone(), project_type, encrypted, storage, self.config.clone(), envelope));
        self.sessions.write().insert(id, session.clone());
        Ok(session)
    }

    /// Fetch a session, loading it from disk into the in-memory registry
    /// on first access. `passphrase` is required the first time an
    /// encrypted session is opened in this process; subsequent calls can
    /// omit it.
    pub async fn get_session(&self, id: &str, passphrase: Option<&str>) -> MemoryResult<Arc<Session>> {
        if let Some(session) = self.sessions.read().get(id).cloned() {
            return Ok(session);
        }

        let row = {
            let registry = self.registry.clone();
            let id = id.to_string();
            tokio::task::spawn_blocking(move || registry.get(&id))
                .await
                .map_err(|e| MemoryError::StorageError(e.to_string()))??
        };
        let Some((project_type, encrypted, _created_at)) = row else {
            return Err(MemoryError::NotFound(id.to_string()));
        };

        let storage = SessionStorage::new(&self.data_root, encrypted, id);
        let envelope = if encrypted {
            let Some(passphrase) = passphrase else {
                return Err(MemoryError::EncryptionRequired);
            };
            let salt = storage.read_salt()?;
            Some(CryptoEnvelope::derive(passphrase, &salt, &self.config.crypto)?)
        } else {
            None
        };

        let session = Arc::new(Session::new(
            id.to_string(),
            project_type,
            encrypted,
            storage,
            self.config.clone(),
            envelope,
        ));
        session.restore_from_disk()?;
        self.sessions.write().insert(id.to_string(), session.clone());
        Ok(session)
    }

    /// Descriptors for every known session. Sessions not currently loaded
    /// into memory report zeroed live stats (their durable metadata is
    /// still accurate).
    pub async fn list_sessions(&self) -> MemoryResult<Vec<SessionDescriptor>> {
        let registry = self.registry.clone();
        let rows = tokio::task::spawn_blocking(move || registry.list())
            .await
            .map_err(|e| MemoryError::StorageError(e.to_string()))??;

        let loaded = self.sessions.read();
        let mut out = Vec::with_capacity(rows.len());
        for (id, project_type, encrypted, created_at) in rows {
            if let Some(session) = loaded.get(&id) {
                out.push(SessionDescriptor {
                    id,
                    project_type,
                    encrypted,
                    created_at,
                    last_activity: OffsetDateTime::now_utc() - session.idle_for(),
                    stats: session.stats(),
                });
            } else {
                out.push(SessionDescriptor {
                    id,
                    project_type,
                    encrypted,
                    created_at,
                    last_activity: created_at,
                    stats: SessionStats {
                        active: 0,
                        short_term: 0,
                        medium_term: 0,
                        long_term: 0,
                        archived: 0,
                        compression_queue: 0,
                        dead_letter: 0,
                        bookmarks: 0,
                        message_count: 0,
                        summary_count: 0,
                        last_compression_tick: None,
                    },
                });
            }
        }
        Ok(out)
    }

    /// Remove a session entirely: its registry row, on-disk directory, and
    /// in-memory state (shredding its key first if encrypted).
    pub async fn delete_session(&self, id: &str) -> MemoryResult<()> {
        let session = self.sessions.write().remove(id);
        self.scheduler.forget_session(id);

        if let Some(session) = &session {
            if session.encrypted {
                session.shred_key()?;
            }
            session.storage().remove()?;
        } else {
            let row = {
                let registry = self.registry.clone();
                let lookup_id = id.to_string();
                tokio::task::spawn_blocking(move || registry.get(&lookup_id))
                    .await
                    .map_err(|e| MemoryError::StorageError(e.to_string()))??
            };
            let Some((_project_type, encrypted, _created_at)) = row else {
                // Already gone from both the in-memory map and the registry:
                // deletion is idempotent, so a repeat call is a no-op.
                return Ok(());
            };
            SessionStorage::new(&self.data_root, encrypted, id).remove()?;
        }

        let registry = self.registry.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || registry.remove(&id))
            .await
            .map_err(|e| MemoryError::StorageError(e.to_string()))??;
        Ok(())
    }

    /// Descriptors of every session whose project type is one of the
    /// medical variants, for callers that need to enumerate protected
    /// sessions without pulling the full registry.
    pub async fn summarize_medical(&self) -> MemoryResult<Vec<SessionDescriptor>> {
        let all = self.list_sessions().await?;
        Ok(all.into_iter().filter(|d| d.project_type.is_medical()).collect())
    }

    /// Irreversibly erase every medical session: shred its key (rendering
    /// encrypted on-disk data unrecoverable even before the files are
    /// unlinked) and remove its directory and registry row. One session's
    /// failure never stops the rest; failures are collected and returned.
    pub async fn delete_all_medical(&self, confirmation_token: &str) -> MemoryResult<Vec<SessionDeletionFailure>> {
        if confirmation_token != MEDICAL_DELETION_CONFIRMATION {
            return Err(MemoryError::ConfirmationRequired);
        }

        let ids = {
            let registry = self.registry.clone();
            tokio::task::spawn_blocking(move || registry.medical_ids())
                .await
                .map_err(|e| MemoryError::StorageError(e.to_string()))??
        };

        let mut failures = Vec::new();
        for id in ids {
            if let Err(err) = self.delete_session(&id).await {
                failures.push(SessionDeletionFailure { session_id: id, source: err });
            }
        }
        Ok(failures)
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_scheduler();
    }
}

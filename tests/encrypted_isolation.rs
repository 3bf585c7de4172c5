//! Scenario 2: encrypted sessions reject the wrong passphrase and keep
//! non-medical sessions entirely in plaintext on disk.

mod common;

use common::{FakeEmbedder, FakeSummarizer};
use hierarchical_memory::{MemoryConfig, MemoryError, ProjectType, Role, SessionManager};
use std::sync::Arc;

fn fast_crypto_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    // Real Argon2id minimums make every derive take real wall-clock time;
    // shrink for the test while keeping the same code path.
    config.crypto.argon2_time_cost = 1;
    config.crypto.argon2_memory_cost_kib = 8 * 1024;
    config
}

#[tokio::test]
async fn wrong_passphrase_fails_reopen_and_plaintext_sessions_stay_plain() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        dir.path(),
        fast_crypto_config(),
        Arc::new(FakeSummarizer),
        Arc::new(FakeEmbedder::new(16)),
    )
    .await
    .unwrap();

    let medical = manager
        .create_session("s_med", ProjectType::MedicalPeer, Some("p1"))
        .await
        .unwrap();
    let story = manager
        .create_session("s_story", ProjectType::Storytelling, None)
        .await
        .unwrap();

    for i in 0..200u32 {
        medical.add_message(Role::User, format!("medical-{i}"), None).unwrap();
        story.add_message(Role::User, format!("story-{i}"), None).unwrap();
    }

    // Simulate a process restart: drop the whole manager (and with it every
    // in-memory session handle) and open a fresh one over the same directory.
    drop(medical);
    drop(story);
    drop(manager);
    let manager = SessionManager::new(
        dir.path(),
        fast_crypto_config(),
        Arc::new(FakeSummarizer),
        Arc::new(FakeEmbedder::new(16)),
    )
    .await
    .unwrap();

    let wrong = manager.get_session("s_med", Some("p2")).await;
    assert!(matches!(wrong, Err(MemoryError::DecryptionFailed)));

    let reopened = manager.get_session("s_med", Some("p1")).await.unwrap();
    let recent = reopened.get_recent(10);
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].content, "medical-199");
    assert_eq!(recent[9].content, "medical-190");

    let story_root = manager.data_root().join("general").join("s_story");
    for entry in walk(&story_root) {
        let bytes = std::fs::read(&entry).unwrap();
        if let Ok(text) = std::str::from_utf8(&bytes) {
            assert!(
                text.contains("story-") || text.is_empty(),
                "expected plaintext content in {entry:?}"
            );
        }
    }
}

fn walk(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    if !root.exists() {
        return out;
    }
    for entry in std::fs::read_dir(root).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path));
        } else {
            out.push(path);
        }
    }
    out
}

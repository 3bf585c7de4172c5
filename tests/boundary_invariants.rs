//! Boundary behaviors and quantified invariants from the spec's testable
//! properties: exact cascade counts, idempotent deletion, and bookmark
//! argument validation.

mod common;

use common::{FakeEmbedder, FakeSummarizer};
use hierarchical_memory::{MemoryConfig, MemoryError, ProjectType, Role, SessionManager};
use std::collections::HashSet;
use std::sync::Arc;

fn config() -> MemoryConfig {
    MemoryConfig::default()
}

#[tokio::test]
async fn eleventh_message_promotes_exactly_one_to_short_term() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(dir.path(), config(), Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();
    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    for i in 0..10u32 {
        session.add_message(Role::User, format!("m{i}"), None).unwrap();
    }
    assert_eq!(session.stats().active, 10);
    assert_eq!(session.stats().short_term, 0);

    session.add_message(Role::User, "m10".to_string(), None).unwrap();
    assert_eq!(session.stats().active, 10);
    assert_eq!(session.stats().short_term, 1);
}

#[tokio::test]
async fn fifty_first_short_term_message_enqueues_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(dir.path(), config(), Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();
    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    for i in 0..60u32 {
        session.add_message(Role::User, format!("m{i}"), None).unwrap();
    }
    assert_eq!(session.stats().compression_queue, 0);

    session.add_message(Role::User, "m60".to_string(), None).unwrap();
    assert_eq!(session.stats().compression_queue, 1);
}

#[tokio::test]
async fn delete_session_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(dir.path(), config(), Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();
    manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    manager.delete_session("s1").await.unwrap();
    let second = manager.delete_session("s1").await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn create_bookmark_rejects_empty_message_ids() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(dir.path(), config(), Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();
    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    let result = session.create_bookmark("l".into(), "d".into(), HashSet::new(), 0.5, vec![]);
    assert!(matches!(result, Err(MemoryError::InvalidArgument(_))));
}

#[tokio::test]
async fn get_recent_is_reverse_chronological_for_small_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(dir.path(), config(), Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();
    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    for i in 0..5u32 {
        session.add_message(Role::User, format!("m{i}"), None).unwrap();
    }
    let recent = session.get_recent(5);
    let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m4", "m3", "m2", "m1", "m0"]);
}

#[tokio::test]
async fn medical_session_without_passphrase_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(dir.path(), config(), Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();

    let result = manager.create_session("s_med", ProjectType::MedicalPeer, None).await;
    assert!(matches!(result, Err(MemoryError::InvalidProjectType)));
}

#[tokio::test]
async fn summarize_medical_lists_only_medical_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config();
    cfg.crypto.argon2_time_cost = 1;
    cfg.crypto.argon2_memory_cost_kib = 8 * 1024;
    let manager = SessionManager::new(dir.path(), cfg, Arc::new(FakeSummarizer), Arc::new(FakeEmbedder::new(8)))
        .await
        .unwrap();

    manager
        .create_session("s_med", ProjectType::MedicalAssistant, Some("p1"))
        .await
        .unwrap();
    manager
        .create_session("s_gen", ProjectType::GeneralAssistant, None)
        .await
        .unwrap();

    let medical = manager.summarize_medical().await.unwrap();
    assert_eq!(medical.len(), 1);
    assert_eq!(medical[0].id, "s_med");
}

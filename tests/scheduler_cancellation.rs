//! Scenario 6: deleting a session mid-batch must not leave an on-disk
//! artifact, and the scheduler must stop touching it on the next tick.

mod common;

use common::{FakeEmbedder, FakeSummarizer};
use hierarchical_memory::{MemoryConfig, ProjectType, Role, SessionManager};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    config.scheduler.idle_threshold = Duration::from_millis(5);
    config
}

#[tokio::test]
async fn delete_mid_batch_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        dir.path(),
        fast_config(),
        Arc::new(FakeSummarizer),
        Arc::new(FakeEmbedder::new(16)),
    )
    .await
    .unwrap();

    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();
    for i in 0..100u32 {
        session.add_message(Role::User, format!("msg-{i}"), None).unwrap();
    }

    manager.delete_session("s1").await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.scheduler().tick().await;

    let root = manager.data_root().join("general").join("s1");
    assert!(!root.exists());

    let sessions = manager.list_sessions().await.unwrap();
    assert!(sessions.iter().all(|d| d.id != "s1"));
}

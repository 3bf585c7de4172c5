//! Scenario 1: adding past the active/short_term thresholds cascades
//! synchronously, and a quiescent scheduler drains the compression queue.

mod common;

use common::{FakeEmbedder, FakeSummarizer};
use hierarchical_memory::{MemoryConfig, ProjectType, Role, SessionManager};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    config.scheduler.idle_threshold = Duration::from_millis(5);
    config.scheduler.deep_idle_threshold = Duration::from_millis(50);
    config
}

#[tokio::test]
async fn sixty_messages_cascade_then_drain_on_quiescence() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        dir.path(),
        fast_config(),
        Arc::new(FakeSummarizer),
        Arc::new(FakeEmbedder::new(32)),
    )
    .await
    .unwrap();

    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    for i in 0..60u32 {
        session
            .add_message(Role::User, format!("msg-{i}"), None)
            .unwrap();
    }

    let stats = session.stats();
    assert_eq!(stats.active, 10);
    assert_eq!(stats.short_term, 40);
    assert_eq!(stats.compression_queue, 10);
    assert_eq!(stats.medium_term + stats.long_term + stats.archived, 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    manager.scheduler().tick().await;

    let stats = session.stats();
    assert_eq!(stats.active, 10);
    assert_eq!(stats.short_term, 40);
    assert_eq!(stats.compression_queue, 0);
    assert!(stats.medium_term >= 1 && stats.medium_term <= 10);
    assert!(stats.last_compression_tick.is_some());
}

//! Scenario 5: a bookmark created against a message that has since been
//! compressed away must still resolve via the summary that absorbed it.

mod common;

use common::{FakeEmbedder, FakeSummarizer};
use hierarchical_memory::{MemoryConfig, ProjectType, Role, SessionManager};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    config.scheduler.idle_threshold = Duration::from_millis(5);
    config
}

#[tokio::test]
async fn bookmark_on_compressed_message_resolves_via_summary() {
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

    for i in 0..300u32 {
        session.add_message(Role::User, format!("msg-{i}"), None).unwrap();
    }

    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.scheduler().tick().await;
    }
    assert_eq!(session.stats().compression_queue, 0, "queue should be fully drained before bookmarking");

    let bookmark_id = session
        .create_bookmark(
            "early exchange".to_string(),
            "message id 5".to_string(),
            HashSet::new(),
            0.8,
            vec![5],
        )
        .unwrap();

    let context = session.get_bookmark_context(&bookmark_id, 2).unwrap();
    assert!(
        !context.is_empty(),
        "expected the compressed summary covering message id 5 to resolve"
    );
    assert!(
        context.iter().any(|r| r.content.contains("msg-5")),
        "expected a resolved summary referencing msg-5, got: {:#?}",
        context
    );

    let bookmarks = session.list_bookmarks();
    assert_eq!(bookmarks.len(), 1);
    assert!(!bookmarks[0].orphaned);
}

//! Scenario 4: a distinctive phrase planted early in a long session must
//! surface in the top-k once its batch has been compressed and indexed.

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
async fn distinctive_phrase_surfaces_after_compression() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(FakeEmbedder::new(64));
    let manager = SessionManager::new(dir.path(), fast_config(), Arc::new(FakeSummarizer), embedder.clone())
        .await
        .unwrap();

    let session = manager
        .create_session("s1", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    for i in 0..100u32 {
        let content = if i == 6 {
            "the dragon breath scorched the courtyard".to_string()
        } else {
            format!("filler message {i}")
        };
        session.add_message(Role::User, content, None).unwrap();
    }

    // Drain every batch to quiescence: 100 messages leaves well more than
    // one batch queued once active+short_term settle at their caps.
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.scheduler().tick().await;
    }

    let results = session
        .query("dragon", None, 5, embedder.as_ref())
        .await
        .unwrap();
    assert!(
        results.iter().any(|r| r.content.contains("dragon breath")),
        "expected a dragon-breath summary in top results, got: {:#?}",
        results
    );
}

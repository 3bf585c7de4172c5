//! Scenario 3: `delete_all_medical` rejects the wrong confirmation token
//! without touching state, and the real token wipes every medical session
//! while leaving general ones untouched.

mod common;

use common::{FakeEmbedder, FakeSummarizer};
use hierarchical_memory::{MemoryConfig, MemoryError, ProjectType, SessionManager};
use std::sync::Arc;

fn fast_crypto_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    config.crypto.argon2_time_cost = 1;
    config.crypto.argon2_memory_cost_kib = 8 * 1024;
    config
}

#[tokio::test]
async fn wrong_token_is_rejected_then_real_token_wipes_only_medical() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new(
        dir.path(),
        fast_crypto_config(),
        Arc::new(FakeSummarizer),
        Arc::new(FakeEmbedder::new(16)),
    )
    .await
    .unwrap();

    manager
        .create_session("s_med1", ProjectType::MedicalPeer, Some("p1"))
        .await
        .unwrap();
    manager
        .create_session("s_med2", ProjectType::MedicalAssistant, Some("p2"))
        .await
        .unwrap();
    manager
        .create_session("s_gen", ProjectType::GeneralChat, None)
        .await
        .unwrap();

    let rejected = manager.delete_all_medical("wrong").await;
    assert!(matches!(rejected, Err(MemoryError::ConfirmationRequired)));
    assert_eq!(manager.list_sessions().await.unwrap().len(), 3);

    let failures = manager
        .delete_all_medical(hierarchical_memory::MEDICAL_DELETION_CONFIRMATION)
        .await
        .unwrap();
    assert!(failures.is_empty());

    let remaining = manager.list_sessions().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "s_gen");

    let medical_secure_root = manager.data_root().join("medical_secure");
    let still_present: Vec<_> = std::fs::read_dir(&medical_secure_root)
        .map(|it| it.collect::<Result<Vec<_>, _>>().unwrap())
        .unwrap_or_default();
    assert!(still_present.is_empty());
}

//! Smoke tests for the CLI commands against a seeded LanceDB directory

use std::sync::Arc;

use recollect::memory::{Digest, DigestScope, Episode, Role, Turn};
use recollect::storage::{LanceStore, MemoryStore};
use recollect_cli::commands::{ActivityCommand, DigestsCommand, EpisodesCommand, HistoryCommand};
use recollect_cli::output::OutputFormat;
use tempfile::TempDir;

async fn seeded_store() -> (Arc<dyn MemoryStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn MemoryStore> = Arc::new(LanceStore::open(dir.path()).await.unwrap());

    store
        .append_turn(&Turn::new("alice", "s1", Role::User, "I love spicy food."))
        .await
        .unwrap();
    store
        .append_turn(&Turn::new("alice", "s1", Role::Assistant, "Noted!"))
        .await
        .unwrap();
    store
        .append_episode(&Episode::new(
            "alice",
            "s1",
            "I love spicy food".to_string(),
            0.8,
            vec![0.1, 0.2, 0.3],
        ))
        .await
        .unwrap();
    store
        .append_digest(&Digest::new(
            "alice",
            DigestScope::session("s1"),
            "- likes spicy food\n- chatty".to_string(),
        ))
        .await
        .unwrap();

    (store, dir)
}

#[tokio::test]
async fn test_commands_run_in_both_formats() {
    let (store, _dir) = seeded_store().await;

    for format in [OutputFormat::Table, OutputFormat::Json] {
        HistoryCommand {
            user_id: "alice".to_string(),
            session: None,
            limit: 16,
        }
        .execute(&store, format)
        .await
        .unwrap();

        EpisodesCommand {
            user_id: "alice".to_string(),
            session: Some("s1".to_string()),
            limit: 20,
        }
        .execute(&store, format)
        .await
        .unwrap();

        DigestsCommand {
            user_id: "alice".to_string(),
            session: None,
            lifetime: false,
            limit: 10,
            full: false,
        }
        .execute(&store, format)
        .await
        .unwrap();

        ActivityCommand {
            user_id: "alice".to_string(),
            days: 30,
        }
        .execute(&store, format)
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_commands_reject_bad_identifiers() {
    let (store, _dir) = seeded_store().await;

    let err = HistoryCommand {
        user_id: "alice smith".to_string(),
        session: None,
        limit: 16,
    }
    .execute(&store, OutputFormat::Table)
    .await
    .unwrap_err();
    assert!(err.to_string().starts_with("Invalid identifier"));

    let err = DigestsCommand {
        user_id: "alice".to_string(),
        session: Some("s1; DROP".to_string()),
        lifetime: false,
        limit: 10,
        full: true,
    }
    .execute(&store, OutputFormat::Table)
    .await
    .unwrap_err();
    assert!(err.to_string().starts_with("Invalid identifier"));
}

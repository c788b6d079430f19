use ingest_core::{config::DatabaseConfig, ArrangementDraft, NewWork, WorkRepository};
use ingest_infrastructure::{DatabaseManager, SqliteWorkRepository};

#[tokio::test]
async fn test_works_survive_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("ingest.db").display()),
        max_connections: 2,
        ..DatabaseConfig::default()
    };
    let new_work = NewWork {
        title: "Song One".to_string(),
        artist: "Test Artist".to_string(),
        external_id: "rec-1".to_string(),
    };
    let draft = ArrangementDraft {
        sections: vec![],
        key: None,
        bpm: None,
    };

    let first_id = {
        let manager = DatabaseManager::new(&config).await.unwrap();
        manager.migrate().await.unwrap();
        let repo = SqliteWorkRepository::new(manager.pool().clone());
        let work = repo.create_or_find_work(&new_work).await.unwrap();
        repo.append_arrangement(work.id, "u1", &draft).await.unwrap();
        manager.close().await;
        work.id
    };

    let manager = DatabaseManager::new(&config).await.unwrap();
    manager.migrate().await.unwrap();
    let repo = SqliteWorkRepository::new(manager.pool().clone());

    let work = repo.create_or_find_work(&new_work).await.unwrap();
    let arrangement = repo.append_arrangement(work.id, "u2", &draft).await.unwrap();

    assert_eq!(work.id, first_id);
    assert_eq!(arrangement.version, 2);
}

//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::YearMonth;
use crate::session::Session;
use crate::store::{FileStore, MemoryStore};
use crate::Config;
use std::sync::Arc;
use tempfile::TempDir;

/// Test environment that sets up a carryover home directory with a Config.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment with an initialized home directory.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("carryover");
        let config = Config::create(&root, Some(50)).await.unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A store reading and writing the data directory of this environment.
    pub fn file_store(&self) -> Arc<FileStore> {
        Arc::new(FileStore::new(self.config.data()))
    }

    /// Opens a session on the data directory of this environment.
    pub async fn session(&self, today: YearMonth) -> Session {
        Session::open(self.file_store(), self.config.debounce(), today)
            .await
            .unwrap()
    }
}

/// Opens a session on a fresh `MemoryStore` and returns both.
pub async fn memory_session(today: YearMonth) -> (Arc<MemoryStore>, Session) {
    let store = Arc::new(MemoryStore::new());
    let session = Session::open(store.clone(), std::time::Duration::from_millis(500), today)
        .await
        .unwrap();
    (store, session)
}

#[tokio::test]
async fn test_file_backed_session_round_trip() {
    use crate::model::{Category, Field};

    let env = TestEnv::new().await;
    let today = YearMonth::new(2025, 0).unwrap();
    let mut session = env.session(today).await;
    session
        .set_field(Category::Income, 0, Field::Amount, "3000")
        .unwrap();
    session.close().await.unwrap();
    assert!(env.file_store().path("budget-data").is_file());

    let session = env.session(today).await;
    assert_eq!(session.summary().total_income, 3000.0);
}

#[tokio::test]
async fn test_memory_session_starts_empty() {
    let today = YearMonth::new(2025, 6).unwrap();
    let (store, session) = memory_session(today).await;
    assert!(session.record().is_empty());
    session.close().await.unwrap();
    assert_eq!(store.save_count("budget-data"), 1);
}

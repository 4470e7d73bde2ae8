//! The persistence collaborator: a key-value store of JSON documents.
//!
//! `FileStore` keeps one JSON file per key on disk. `MemoryStore` keeps everything in memory; it
//! is compiled even in the "production" version of this app so that the whole program can be run,
//! top-to-bottom, without touching the data directory.

mod file_store;
mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use crate::{Config, Result};
use serde::Serialize;
use std::sync::Arc;

/// When this environment variable is set and non-empty, the app uses a `MemoryStore`.
pub const TEST_MODE_ENV: &str = "CARRYOVER_IN_TEST_MODE";

/// Loads and saves JSON documents by key. Implementations must be safe to share between the
/// session and the background save tasks.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Returns the document stored under `key`, or `None` if there is none.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Replaces the document stored under `key`.
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<()>;
}

/// Selects which `Store` implementation the app runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Persist to files in the data directory.
    #[default]
    File,
    /// Keep everything in memory.
    Testing,
}

impl Mode {
    /// `Mode::Testing` if `CARRYOVER_IN_TEST_MODE` is set and non-empty, otherwise `Mode::File`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Testing,
            _ => Mode::File,
        }
    }
}

/// Creates the store for `mode`.
pub fn store(config: &Config, mode: Mode) -> Arc<dyn Store> {
    match mode {
        Mode::File => Arc::new(FileStore::new(config.data())),
        Mode::Testing => Arc::new(MemoryStore::new()),
    }
}

/// The independently persisted datasets. Each has its own key and its own save schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Ledger,
    FixedTemplates,
    DebtTemplates,
    Theme,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Ledger,
        Dataset::FixedTemplates,
        Dataset::DebtTemplates,
        Dataset::Theme,
    ];

    /// The key the dataset is stored under.
    pub fn key(&self) -> &'static str {
        match self {
            Dataset::Ledger => "budget-data",
            Dataset::FixedTemplates => "budget-fixed-expense-templates",
            Dataset::DebtTemplates => "budget-debt-templates",
            Dataset::Theme => "budget-theme",
        }
    }
}

#[test]
fn test_dataset_keys_are_distinct() {
    let mut keys: Vec<&str> = Dataset::ALL.iter().map(|d| d.key()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), Dataset::ALL.len());
}

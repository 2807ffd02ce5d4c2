//! Test Helper Utilities
//!
//! Shared utilities for testing tally-collector

#![allow(dead_code)]

pub mod extractor;
pub mod memory_store;
pub mod reports;

use std::sync::Arc;

use tally_collector::store::SqliteStore;
use tally_common::catalog::seed_constituencies;
use tally_common::db::{init_database, DATABASE_FILE};
use tally_common::events::EventBus;
use tempfile::TempDir;

pub use extractor::ScriptedExtractor;
pub use memory_store::MemoryStore;
pub use reports::{candidates, report, results_json, sources};

/// Create a seeded SQLite store in a temporary folder
///
/// Returns (TempDir, store) - TempDir must be kept alive for duration of test
pub async fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join(DATABASE_FILE))
        .await
        .unwrap();

    let store = Arc::new(SqliteStore::new(pool, EventBus::new(256)));
    {
        use tally_collector::store::ElectionStore;
        store
            .seed_constituencies(&seed_constituencies())
            .await
            .unwrap();
    }
    (temp_dir, store)
}

/// In-memory store pre-loaded with the constituency catalog
pub fn seeded_memory_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.load_constituencies(seed_constituencies());
    store
}

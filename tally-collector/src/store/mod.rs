//! Persistence collaborator
//!
//! Document-store view of the election data: keyed constituency records,
//! append-only collections, and merge-written singleton documents. Every write
//! is announced on the event bus.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;
use tally_common::models::{
    AuditEntry, ConflictResolution, ConstituencyRecord, DataConflict, ElectionUpdate, NewsItem,
    PendingStatus, PendingUpdate, SystemError, SystemErrorStatus,
};
use tally_common::Result;

/// Singleton document names
pub mod documents {
    pub const STATUS: &str = "status";
    pub const SUMMARY: &str = "summary";
    pub const REFERENDUM: &str = "referendum";
    pub const SOURCES: &str = "sources";
}

/// Ticker entries returned by [`ElectionStore::recent_updates`] by default
pub const UPDATE_FEED_LIMIT: usize = 50;

/// News items returned by the news listing by default
pub const NEWS_FEED_LIMIT: usize = 20;

#[async_trait]
pub trait ElectionStore: Send + Sync {
    // Constituencies
    async fn constituencies(&self) -> Result<Vec<ConstituencyRecord>>;
    /// Insert or replace one record keyed by id
    async fn put_constituency(&self, record: &ConstituencyRecord) -> Result<()>;
    /// Replace the whole collection in one transaction
    async fn seed_constituencies(&self, records: &[ConstituencyRecord]) -> Result<()>;

    // Ticker
    async fn add_update(&self, update: &ElectionUpdate) -> Result<()>;
    /// Newest first, at most `limit`
    async fn recent_updates(&self, limit: usize) -> Result<Vec<ElectionUpdate>>;

    // Singleton documents
    /// Shallow-merge `patch` (a JSON object) into the named document
    async fn merge_document(&self, name: &str, patch: Value) -> Result<()>;
    async fn document(&self, name: &str) -> Result<Option<Value>>;

    // News
    async fn add_news(&self, item: &NewsItem) -> Result<()>;
    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>>;

    // Review queue
    async fn add_pending_update(&self, update: &PendingUpdate) -> Result<()>;
    async fn pending_update(&self, id: &str) -> Result<Option<PendingUpdate>>;
    /// Updates still awaiting review, oldest first
    async fn pending_updates(&self) -> Result<Vec<PendingUpdate>>;
    /// Returns false when no such update exists
    async fn set_pending_status(&self, id: &str, status: PendingStatus) -> Result<bool>;

    // Conflicts
    async fn add_conflict(&self, conflict: &DataConflict) -> Result<()>;
    async fn conflict(&self, id: &str) -> Result<Option<DataConflict>>;
    /// Full history, newest first
    async fn conflicts(&self) -> Result<Vec<DataConflict>>;
    /// Returns false when no such conflict exists
    async fn resolve_conflict(
        &self,
        id: &str,
        resolved_by: ConflictResolution,
        resolution: &str,
        resolved_at: i64,
    ) -> Result<bool>;

    // Audit
    async fn add_audit_entry(&self, entry: &AuditEntry) -> Result<()>;
    /// Entries for one constituency (or all when `None`), newest first
    async fn audit_log(&self, constituency_id: Option<&str>, limit: usize)
        -> Result<Vec<AuditEntry>>;

    // System error log
    async fn add_system_error(&self, error: &SystemError) -> Result<()>;
    /// Active errors, newest first
    async fn active_system_errors(&self, limit: usize) -> Result<Vec<SystemError>>;
    async fn set_system_error_status(&self, id: &str, status: SystemErrorStatus)
        -> Result<bool>;
}

//! In-memory ElectionStore with failure injection

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tally_collector::store::ElectionStore;
use tally_common::models::{
    AuditEntry, ConflictResolution, ConstituencyRecord, DataConflict, ElectionUpdate, NewsItem,
    PendingStatus, PendingUpdate, SystemError, SystemErrorStatus,
};
use tally_common::{Error, Result};

#[derive(Default)]
struct Collections {
    constituencies: HashMap<String, ConstituencyRecord>,
    updates: Vec<ElectionUpdate>,
    documents: HashMap<String, serde_json::Map<String, Value>>,
    news: Vec<NewsItem>,
    pending: Vec<PendingUpdate>,
    conflicts: Vec<DataConflict>,
    audit: Vec<AuditEntry>,
    errors: Vec<SystemError>,
}

/// Store backed by plain collections
///
/// `fail_writes` makes every write fail; `fail_reads` makes every read fail;
/// `fail_ticker` makes only ticker appends fail.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Collections>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_ticker: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_constituencies(&self, records: Vec<ConstituencyRecord>) {
        let mut data = self.data.lock().unwrap();
        data.constituencies = records.into_iter().map(|r| (r.id.clone(), r)).collect();
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_ticker(&self, fail: bool) {
        self.fail_ticker.store(fail, Ordering::SeqCst);
    }

    pub fn update_count(&self) -> usize {
        self.data.lock().unwrap().updates.len()
    }

    pub fn news_count(&self) -> usize {
        self.data.lock().unwrap().news.len()
    }

    pub fn system_error_count(&self) -> usize {
        self.data.lock().unwrap().errors.len()
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected write failure".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected read failure".to_string()));
        }
        Ok(())
    }
}

fn newest_first<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().rev().take(limit).cloned().collect()
}

#[async_trait]
impl ElectionStore for MemoryStore {
    async fn constituencies(&self) -> Result<Vec<ConstituencyRecord>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        let mut records: Vec<ConstituencyRecord> = data.constituencies.values().cloned().collect();
        records.sort_by_key(|r| r.number);
        Ok(records)
    }

    async fn put_constituency(&self, record: &ConstituencyRecord) -> Result<()> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        data.constituencies.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn seed_constituencies(&self, records: &[ConstituencyRecord]) -> Result<()> {
        self.check_write()?;
        self.load_constituencies(records.to_vec());
        Ok(())
    }

    async fn add_update(&self, update: &ElectionUpdate) -> Result<()> {
        self.check_write()?;
        if self.fail_ticker.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected ticker failure".to_string()));
        }
        self.data.lock().unwrap().updates.push(update.clone());
        Ok(())
    }

    async fn recent_updates(&self, limit: usize) -> Result<Vec<ElectionUpdate>> {
        self.check_read()?;
        Ok(newest_first(&self.data.lock().unwrap().updates, limit))
    }

    async fn merge_document(&self, name: &str, patch: Value) -> Result<()> {
        self.check_write()?;
        let Value::Object(fields) = patch else {
            return Err(Error::InvalidInput(format!("{} patch is not an object", name)));
        };
        let mut data = self.data.lock().unwrap();
        let doc = data.documents.entry(name.to_string()).or_default();
        for (key, value) in fields {
            doc.insert(key, value);
        }
        Ok(())
    }

    async fn document(&self, name: &str) -> Result<Option<Value>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data.documents.get(name).cloned().map(Value::Object))
    }

    async fn add_news(&self, item: &NewsItem) -> Result<()> {
        self.check_write()?;
        self.data.lock().unwrap().news.push(item.clone());
        Ok(())
    }

    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>> {
        self.check_read()?;
        Ok(newest_first(&self.data.lock().unwrap().news, limit))
    }

    async fn add_pending_update(&self, update: &PendingUpdate) -> Result<()> {
        self.check_write()?;
        self.data.lock().unwrap().pending.push(update.clone());
        Ok(())
    }

    async fn pending_update(&self, id: &str) -> Result<Option<PendingUpdate>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data.pending.iter().find(|p| p.id == id).cloned())
    }

    async fn pending_updates(&self) -> Result<Vec<PendingUpdate>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .pending
            .iter()
            .filter(|p| p.status == PendingStatus::Pending)
            .cloned()
            .collect())
    }

    async fn set_pending_status(&self, id: &str, status: PendingStatus) -> Result<bool> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        match data.pending.iter_mut().find(|p| p.id == id) {
            Some(pending) => {
                pending.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_conflict(&self, conflict: &DataConflict) -> Result<()> {
        self.check_write()?;
        self.data.lock().unwrap().conflicts.push(conflict.clone());
        Ok(())
    }

    async fn conflict(&self, id: &str) -> Result<Option<DataConflict>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data.conflicts.iter().find(|c| c.id == id).cloned())
    }

    async fn conflicts(&self) -> Result<Vec<DataConflict>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data.conflicts.iter().rev().cloned().collect())
    }

    async fn resolve_conflict(
        &self,
        id: &str,
        resolved_by: ConflictResolution,
        resolution: &str,
        resolved_at: i64,
    ) -> Result<bool> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        match data.conflicts.iter_mut().find(|c| c.id == id) {
            Some(conflict) => {
                conflict.resolved_by = resolved_by;
                conflict.resolution = Some(resolution.to_string());
                conflict.resolved_at = Some(resolved_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.check_write()?;
        self.data.lock().unwrap().audit.push(entry.clone());
        Ok(())
    }

    async fn audit_log(
        &self,
        constituency_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .audit
            .iter()
            .rev()
            .filter(|e| constituency_id.map_or(true, |id| e.constituency_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn add_system_error(&self, error: &SystemError) -> Result<()> {
        self.check_write()?;
        self.data.lock().unwrap().errors.push(error.clone());
        Ok(())
    }

    async fn active_system_errors(&self, limit: usize) -> Result<Vec<SystemError>> {
        self.check_read()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .errors
            .iter()
            .rev()
            .filter(|e| e.status == SystemErrorStatus::Active)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn set_system_error_status(
        &self,
        id: &str,
        status: SystemErrorStatus,
    ) -> Result<bool> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        match data.errors.iter_mut().find(|e| e.id == id) {
            Some(error) => {
                error.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

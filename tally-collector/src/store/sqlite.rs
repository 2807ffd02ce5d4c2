//! SQLite-backed [`ElectionStore`]
//!
//! Records are stored as JSON text next to the columns used for filtering and
//! ordering. Status changes use `json_set` and singleton merges use
//! `json_patch`, so each write is a single atomic statement.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tally_common::db::retry_on_lock;
use tally_common::events::{ElectionEvent, EventBus};
use tally_common::models::{
    AuditEntry, ConflictResolution, ConstituencyRecord, DataConflict, ElectionUpdate, NewsItem,
    PendingStatus, PendingUpdate, SystemError, SystemErrorStatus,
};
use tally_common::time::now_millis;
use tally_common::{Error, Result};
use tracing::debug;

use super::ElectionStore;

/// Upper bound on waiting out a locked database for one write
const LOCK_WAIT_MS: u64 = 5_000;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    events: EventBus,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self { pool, events }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    async fn fetch_documents<T: DeserializeOwned>(
        &self,
        sql: &str,
        binds: &[SqlArg<'_>],
    ) -> Result<Vec<T>> {
        let mut query = sqlx::query_scalar::<_, String>(sql);
        for bind in binds {
            query = match bind {
                SqlArg::Text(s) => query.bind(*s),
                SqlArg::Int(i) => query.bind(*i),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(|raw| decode(raw)).collect()
    }
}

enum SqlArg<'a> {
    Text(&'a str),
    Int(i64),
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

fn limit_arg(limit: usize) -> SqlArg<'static> {
    SqlArg::Int(i64::try_from(limit).unwrap_or(i64::MAX))
}

#[async_trait]
impl ElectionStore for SqliteStore {
    async fn constituencies(&self) -> Result<Vec<ConstituencyRecord>> {
        self.fetch_documents("SELECT data FROM constituencies ORDER BY number ASC", &[])
            .await
    }

    async fn put_constituency(&self, record: &ConstituencyRecord) -> Result<()> {
        let data = encode(record)?;
        let (pool, data) = (&self.pool, &data);

        retry_on_lock("constituency write", LOCK_WAIT_MS, || async move {
            sqlx::query(
                r#"
                INSERT INTO constituencies (id, number, data, last_updated)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    number = excluded.number,
                    data = excluded.data,
                    last_updated = excluded.last_updated
                "#,
            )
            .bind(&record.id)
            .bind(record.number as i64)
            .bind(data)
            .bind(record.last_updated)
            .execute(pool)
            .await?;
            Ok::<(), Error>(())
        })
        .await?;

        self.events.emit_lossy(ElectionEvent::ConstituencyUpdated {
            constituency_id: record.id.clone(),
            number: record.number,
            status: record.status,
            trust_score: record.trust_score,
            timestamp: now_millis(),
        });
        Ok(())
    }

    async fn seed_constituencies(&self, records: &[ConstituencyRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM constituencies").execute(&mut *tx).await?;

        for record in records {
            sqlx::query(
                "INSERT INTO constituencies (id, number, data, last_updated) VALUES (?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(record.number as i64)
            .bind(encode(record)?)
            .bind(record.last_updated)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = records.len(), "Constituencies seeded");
        self.events.emit_lossy(ElectionEvent::ConstituenciesSeeded {
            count: records.len(),
            timestamp: now_millis(),
        });
        Ok(())
    }

    async fn add_update(&self, update: &ElectionUpdate) -> Result<()> {
        let data = encode(update)?;
        let (pool, data) = (&self.pool, &data);

        retry_on_lock("ticker append", LOCK_WAIT_MS, || async move {
            sqlx::query("INSERT INTO updates (id, timestamp, data) VALUES (?, ?, ?)")
                .bind(&update.id)
                .bind(update.timestamp)
                .bind(data)
                .execute(pool)
                .await?;
            Ok::<(), Error>(())
        })
        .await?;

        self.events.emit_lossy(ElectionEvent::UpdatePublished {
            update: update.clone(),
        });
        Ok(())
    }

    async fn recent_updates(&self, limit: usize) -> Result<Vec<ElectionUpdate>> {
        self.fetch_documents(
            "SELECT data FROM updates ORDER BY timestamp DESC, rowid DESC LIMIT ?",
            &[limit_arg(limit)],
        )
        .await
    }

    async fn merge_document(&self, name: &str, patch: Value) -> Result<()> {
        if !patch.is_object() {
            return Err(Error::InvalidInput(format!(
                "document patch for '{}' must be a JSON object",
                name
            )));
        }
        let data = encode(&patch)?;
        let (pool, data) = (&self.pool, &data);
        let updated_at = now_millis();

        retry_on_lock("document merge", LOCK_WAIT_MS, || async move {
            sqlx::query(
                r#"
                INSERT INTO documents (name, data, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    data = json_patch(documents.data, excluded.data),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(name)
            .bind(data)
            .bind(updated_at)
            .execute(pool)
            .await?;
            Ok::<(), Error>(())
        })
        .await?;

        self.events.emit_lossy(ElectionEvent::DocumentUpdated {
            document: name.to_string(),
            timestamp: updated_at,
        });
        Ok(())
    }

    async fn document(&self, name: &str) -> Result<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT data FROM documents WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        raw.as_deref().map(decode).transpose()
    }

    async fn add_news(&self, item: &NewsItem) -> Result<()> {
        sqlx::query("INSERT INTO news (id, timestamp, data) VALUES (?, ?, ?)")
            .bind(&item.id)
            .bind(item.timestamp)
            .bind(encode(item)?)
            .execute(&self.pool)
            .await?;

        self.events
            .emit_lossy(ElectionEvent::NewsPublished { item: item.clone() });
        Ok(())
    }

    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>> {
        self.fetch_documents(
            "SELECT data FROM news ORDER BY timestamp DESC, rowid DESC LIMIT ?",
            &[limit_arg(limit)],
        )
        .await
    }

    async fn add_pending_update(&self, update: &PendingUpdate) -> Result<()> {
        sqlx::query(
            "INSERT INTO pending_updates (id, constituency_id, status, timestamp, data) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&update.id)
        .bind(&update.constituency_id)
        .bind(update.status.as_str())
        .bind(update.timestamp)
        .bind(encode(update)?)
        .execute(&self.pool)
        .await?;

        self.events.emit_lossy(ElectionEvent::PendingUpdateStaged {
            pending_id: update.id.clone(),
            constituency_id: update.constituency_id.clone(),
            trust_score: update.trust_score,
            timestamp: update.timestamp,
        });
        Ok(())
    }

    async fn pending_update(&self, id: &str) -> Result<Option<PendingUpdate>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT data FROM pending_updates WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        raw.as_deref().map(decode).transpose()
    }

    async fn pending_updates(&self) -> Result<Vec<PendingUpdate>> {
        self.fetch_documents(
            "SELECT data FROM pending_updates WHERE status = ? ORDER BY timestamp ASC, rowid ASC",
            &[SqlArg::Text(PendingStatus::Pending.as_str())],
        )
        .await
    }

    async fn set_pending_status(&self, id: &str, status: PendingStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pending_updates SET status = ?, data = json_set(data, '$.status', ?) \
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let found = result.rows_affected() > 0;
        if found {
            self.events.emit_lossy(ElectionEvent::PendingUpdateReviewed {
                pending_id: id.to_string(),
                status: status.as_str().to_string(),
                timestamp: now_millis(),
            });
        }
        Ok(found)
    }

    async fn add_conflict(&self, conflict: &DataConflict) -> Result<()> {
        sqlx::query(
            "INSERT INTO conflicts (id, constituency_id, resolved_by, created_at, data) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&conflict.id)
        .bind(&conflict.constituency_id)
        .bind(resolution_name(conflict.resolved_by))
        .bind(conflict.created_at)
        .bind(encode(conflict)?)
        .execute(&self.pool)
        .await?;

        self.events.emit_lossy(ElectionEvent::ConflictRecorded {
            conflict_id: conflict.id.clone(),
            constituency_id: conflict.constituency_id.clone(),
            conflict_type: conflict.conflict_type,
            severity: conflict.severity,
            resolved: conflict.is_resolved(),
            timestamp: conflict.created_at,
        });
        Ok(())
    }

    async fn conflict(&self, id: &str) -> Result<Option<DataConflict>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT data FROM conflicts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        raw.as_deref().map(decode).transpose()
    }

    async fn conflicts(&self) -> Result<Vec<DataConflict>> {
        self.fetch_documents(
            "SELECT data FROM conflicts ORDER BY created_at DESC, rowid DESC",
            &[],
        )
        .await
    }

    async fn resolve_conflict(
        &self,
        id: &str,
        resolved_by: ConflictResolution,
        resolution: &str,
        resolved_at: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conflicts SET
                resolved_by = ?,
                data = json_set(data, '$.resolvedBy', ?, '$.resolution', ?, '$.resolvedAt', ?)
            WHERE id = ?
            "#,
        )
        .bind(resolution_name(resolved_by))
        .bind(resolution_name(resolved_by))
        .bind(resolution)
        .bind(resolved_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let found = result.rows_affected() > 0;
        if found {
            self.events.emit_lossy(ElectionEvent::ConflictResolved {
                conflict_id: id.to_string(),
                timestamp: resolved_at,
            });
        }
        Ok(found)
    }

    async fn add_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        let data = encode(entry)?;
        let (pool, data) = (&self.pool, &data);

        retry_on_lock("audit append", LOCK_WAIT_MS, || async move {
            sqlx::query(
                "INSERT INTO audit_log (id, constituency_id, timestamp, data) VALUES (?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind(&entry.constituency_id)
            .bind(entry.timestamp)
            .bind(data)
            .execute(pool)
            .await?;
            Ok::<(), Error>(())
        })
        .await
    }

    async fn audit_log(
        &self,
        constituency_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>> {
        match constituency_id {
            Some(id) => {
                self.fetch_documents(
                    "SELECT data FROM audit_log WHERE constituency_id = ? \
                     ORDER BY timestamp DESC, rowid DESC LIMIT ?",
                    &[SqlArg::Text(id), limit_arg(limit)],
                )
                .await
            }
            None => {
                self.fetch_documents(
                    "SELECT data FROM audit_log ORDER BY timestamp DESC, rowid DESC LIMIT ?",
                    &[limit_arg(limit)],
                )
                .await
            }
        }
    }

    async fn add_system_error(&self, error: &SystemError) -> Result<()> {
        sqlx::query("INSERT INTO system_errors (id, status, timestamp, data) VALUES (?, ?, ?, ?)")
            .bind(&error.id)
            .bind(error.status.as_str())
            .bind(error.timestamp)
            .bind(encode(error)?)
            .execute(&self.pool)
            .await?;

        self.events.emit_lossy(ElectionEvent::SystemErrorLogged {
            error_id: error.id.clone(),
            message: error.message.clone(),
            timestamp: error.timestamp,
        });
        Ok(())
    }

    async fn active_system_errors(&self, limit: usize) -> Result<Vec<SystemError>> {
        self.fetch_documents(
            "SELECT data FROM system_errors WHERE status = ? \
             ORDER BY timestamp DESC, rowid DESC LIMIT ?",
            &[SqlArg::Text(SystemErrorStatus::Active.as_str()), limit_arg(limit)],
        )
        .await
    }

    async fn set_system_error_status(
        &self,
        id: &str,
        status: SystemErrorStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE system_errors SET status = ?, data = json_set(data, '$.status', ?) \
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn resolution_name(resolution: ConflictResolution) -> &'static str {
    match resolution {
        ConflictResolution::AutoConsensus => "auto_consensus",
        ConflictResolution::AdminOverride => "admin_override",
        ConflictResolution::Pending => "pending",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tally_common::catalog::seed_constituencies;
    use tally_common::db::init_database;
    use tally_common::models::{new_id, UpdateKind};
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, SqliteStore::new(pool, EventBus::new(100)))
    }

    fn update(timestamp: i64) -> ElectionUpdate {
        ElectionUpdate {
            id: new_id(),
            constituency_id: "dhaka-1".to_string(),
            constituency_name: "Dhaka-1".to_string(),
            timestamp,
            kind: UpdateKind::VoteUpdate,
            message: format!("update at {}", timestamp),
            trust_score: 70,
            source: "test".to_string(),
            is_verified: true,
        }
    }

    #[tokio::test]
    async fn test_seed_replaces_collection() {
        let (_dir, store) = test_store().await;
        let seed = seed_constituencies();

        store.seed_constituencies(&seed).await.unwrap();
        store.seed_constituencies(&seed[..10]).await.unwrap();

        let stored = store.constituencies().await.unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0], seed[0]);
    }

    #[tokio::test]
    async fn test_put_constituency_upserts_and_notifies() {
        let (_dir, store) = test_store().await;
        let mut rx = store.events().subscribe();
        let mut record = seed_constituencies().remove(0);

        store.put_constituency(&record).await.unwrap();
        record.total_votes = 1_234;
        store.put_constituency(&record).await.unwrap();

        let stored = store.constituencies().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_votes, 1_234);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "ConstituencyUpdated");
    }

    #[tokio::test]
    async fn test_recent_updates_newest_first_and_capped() {
        let (_dir, store) = test_store().await;
        for ts in 1..=5 {
            store.add_update(&update(ts)).await.unwrap();
        }

        let recent = store.recent_updates(3).await.unwrap();
        let stamps: Vec<i64> = recent.iter().map(|u| u.timestamp).collect();
        assert_eq!(stamps, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_merge_document_keeps_unpatched_fields() {
        let (_dir, store) = test_store().await;
        store
            .merge_document("status", json!({"isCollecting": true, "apiCallsToday": 3}))
            .await
            .unwrap();
        store
            .merge_document("status", json!({"apiCallsToday": 7}))
            .await
            .unwrap();

        let doc = store.document("status").await.unwrap().unwrap();
        assert_eq!(doc["isCollecting"], true);
        assert_eq!(doc["apiCallsToday"], 7);
        assert!(store.document("summary").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_document_rejects_non_object() {
        let (_dir, store) = test_store().await;
        let err = store.merge_document("status", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_system_error_status_round_trip() {
        let (_dir, store) = test_store().await;
        let error = SystemError {
            id: new_id(),
            timestamp: 10,
            kind: tally_common::models::SystemErrorKind::Parsing,
            source_id: Some("bdnews24".to_string()),
            message: "bad json".to_string(),
            details: None,
            status: SystemErrorStatus::Active,
        };
        store.add_system_error(&error).await.unwrap();
        assert_eq!(store.active_system_errors(10).await.unwrap().len(), 1);

        assert!(store
            .set_system_error_status(&error.id, SystemErrorStatus::Resolved)
            .await
            .unwrap());
        assert!(store.active_system_errors(10).await.unwrap().is_empty());
        assert!(!store
            .set_system_error_status("missing", SystemErrorStatus::Resolved)
            .await
            .unwrap());
    }
}

//! The Mapping Store (C2): durable bidirectional map between Left/Right
//! keys and sync state.

use super::DbPool;
use crate::error::SyncError;
use crate::models::{CommentSyncRecord, IssueSyncRecord, Side, SyncStatus};
use chrono::Utc;

#[derive(Clone)]
pub struct MappingStore {
    pool: DbPool,
}

impl MappingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upsert an Issue Sync Record whole: last write wins.
    pub async fn save_issue_record(&self, record: &IssueSyncRecord) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            INSERT INTO issue_sync_records (
                sync_id, left_key, right_key, status, last_sync_direction,
                last_sync_timestamp, left_last_updated, right_last_updated,
                error_count, last_error, requires_manual_resolution, conflict_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(sync_id) DO UPDATE SET
                left_key = excluded.left_key,
                right_key = excluded.right_key,
                status = excluded.status,
                last_sync_direction = excluded.last_sync_direction,
                last_sync_timestamp = excluded.last_sync_timestamp,
                left_last_updated = excluded.left_last_updated,
                right_last_updated = excluded.right_last_updated,
                error_count = excluded.error_count,
                last_error = excluded.last_error,
                requires_manual_resolution = excluded.requires_manual_resolution,
                conflict_details = excluded.conflict_details
            "#,
        )
        .bind(&record.sync_id)
        .bind(&record.left_key)
        .bind(&record.right_key)
        .bind(&record.status)
        .bind(&record.last_sync_direction)
        .bind(record.last_sync_timestamp)
        .bind(record.left_last_updated)
        .bind(record.right_last_updated)
        .bind(record.error_count)
        .bind(&record.last_error)
        .bind(record.requires_manual_resolution)
        .bind(&record.conflict_details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_issue_record(&self, sync_id: &str) -> Result<Option<IssueSyncRecord>, SyncError> {
        let record = sqlx::query_as::<_, IssueSyncRecord>("SELECT * FROM issue_sync_records WHERE sync_id = ?")
            .bind(sync_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Find the record pairing `key` on `side`, via the per-side secondary
    /// index.
    pub async fn find_issue_record_by_key(&self, key: &str, side: Side) -> Result<Option<IssueSyncRecord>, SyncError> {
        let column = match side {
            Side::Left => "left_key",
            Side::Right => "right_key",
        };
        let sql = format!("SELECT * FROM issue_sync_records WHERE {column} = ?");
        let record = sqlx::query_as::<_, IssueSyncRecord>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// List records by status, via the status secondary index.
    pub async fn list_issue_records_by_status(&self, status: SyncStatus) -> Result<Vec<IssueSyncRecord>, SyncError> {
        let records = sqlx::query_as::<_, IssueSyncRecord>("SELECT * FROM issue_sync_records WHERE status = ?")
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    pub async fn scan(&self, limit: Option<i64>) -> Result<Vec<IssueSyncRecord>, SyncError> {
        let records = match limit {
            Some(limit) => {
                sqlx::query_as::<_, IssueSyncRecord>("SELECT * FROM issue_sync_records LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, IssueSyncRecord>("SELECT * FROM issue_sync_records")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(records)
    }

    pub async fn save_comment_record(&self, record: &CommentSyncRecord) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            INSERT INTO comment_sync_records (
                sync_id, issue_key, source_comment_id, target_comment_id,
                source_side, target_side, last_sync_timestamp, sync_direction, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(sync_id) DO UPDATE SET
                target_comment_id = excluded.target_comment_id,
                last_sync_timestamp = excluded.last_sync_timestamp,
                sync_direction = excluded.sync_direction,
                status = excluded.status
            "#,
        )
        .bind(&record.sync_id)
        .bind(&record.issue_key)
        .bind(&record.source_comment_id)
        .bind(&record.target_comment_id)
        .bind(&record.source_side)
        .bind(&record.target_side)
        .bind(record.last_sync_timestamp)
        .bind(&record.sync_direction)
        .bind(&record.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_comment_record(&self, sync_id: &str) -> Result<Option<CommentSyncRecord>, SyncError> {
        let record = sqlx::query_as::<_, CommentSyncRecord>("SELECT * FROM comment_sync_records WHERE sync_id = ?")
            .bind(sync_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    pub async fn find_comment_by_source(
        &self,
        issue_key: &str,
        source_comment_id: &str,
        target_side: Side,
    ) -> Result<Option<CommentSyncRecord>, SyncError> {
        let sync_id = CommentSyncRecord::sync_id(issue_key, source_comment_id, target_side);
        self.get_comment_record(&sync_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueSyncRecord;
    use chrono::TimeZone;

    async fn test_store() -> MappingStore {
        let dir = tempfile::tempdir().unwrap();
        let pool = super::super::pool::create_pool(&dir.path().join("test.db")).await.unwrap();
        std::mem::forget(dir);
        MappingStore::new(pool)
    }

    #[tokio::test]
    async fn save_and_get_round_trip() {
        let store = test_store().await;
        let wm = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let record = IssueSyncRecord::new_half_formed("PROJ-1", Side::Left, wm);

        store.save_issue_record(&record).await.unwrap();
        let fetched = store.get_issue_record(&record.sync_id).await.unwrap().unwrap();
        assert_eq!(fetched.left_key.as_deref(), Some("PROJ-1"));
        assert_eq!(fetched.status_enum(), SyncStatus::InProgress);
    }

    #[tokio::test]
    async fn find_by_key_uses_correct_side() {
        let store = test_store().await;
        let wm = Utc::now();
        let record = IssueSyncRecord::new_half_formed("PROJ-1", Side::Left, wm);
        store.save_issue_record(&record).await.unwrap();

        assert!(store.find_issue_record_by_key("PROJ-1", Side::Left).await.unwrap().is_some());
        assert!(store.find_issue_record_by_key("PROJ-1", Side::Right).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_whole_record() {
        let store = test_store().await;
        let wm = Utc::now();
        let mut record = IssueSyncRecord::new_half_formed("PROJ-1", Side::Left, wm);
        store.save_issue_record(&record).await.unwrap();

        record.status = SyncStatus::Success.to_string();
        record.set_key(Side::Right, "RPROJ-9".into());
        record.recanonicalize_sync_id();
        store.save_issue_record(&record).await.unwrap();

        let fetched = store.get_issue_record(&record.sync_id).await.unwrap().unwrap();
        assert_eq!(fetched.status_enum(), SyncStatus::Success);
        assert_eq!(fetched.right_key.as_deref(), Some("RPROJ-9"));
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let store = test_store().await;
        let mut failed = IssueSyncRecord::new_half_formed("A-1", Side::Left, Utc::now());
        failed.status = SyncStatus::Failed.to_string();
        store.save_issue_record(&failed).await.unwrap();

        let pending = IssueSyncRecord::new_half_formed("B-1", Side::Left, Utc::now());
        store.save_issue_record(&pending).await.unwrap();

        let results = store.list_issue_records_by_status(SyncStatus::Failed).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].left_key.as_deref(), Some("A-1"));
    }

    #[tokio::test]
    async fn comment_record_round_trip() {
        let store = test_store().await;
        let record = CommentSyncRecord {
            sync_id: CommentSyncRecord::sync_id("PROJ-1", "42", Side::Right),
            issue_key: "PROJ-1".into(),
            source_comment_id: "42".into(),
            target_comment_id: None,
            source_side: Side::Left.to_string(),
            target_side: Side::Right.to_string(),
            last_sync_timestamp: Utc::now(),
            sync_direction: None,
            status: SyncStatus::Pending.to_string(),
        };
        store.save_comment_record(&record).await.unwrap();

        let found = store.find_comment_by_source("PROJ-1", "42", Side::Right).await.unwrap().unwrap();
        assert_eq!(found.issue_key, "PROJ-1");
        assert!(found.target_comment_id.is_none());
    }
}

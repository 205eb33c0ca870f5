//! The Comment Reconciler (C4): mirrors public comments onto the paired
//! issue with `[JIRA-SYNC]` attribution.

use crate::db::MappingStore;
use crate::error::SyncError;
use crate::models::{Comment, CommentSyncRecord, Side, SyncStatus};
use crate::remote::RemoteClient;
use chrono::Utc;

/// The kind of comment webhook event that triggered reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentEvent {
    Created,
    Updated,
    Deleted,
}

pub struct CommentReconciler {
    left: RemoteClient,
    right: RemoteClient,
    store: MappingStore,
}

impl CommentReconciler {
    pub fn new(left: RemoteClient, right: RemoteClient, store: MappingStore) -> Self {
        Self { left, right, store }
    }

    fn client(&self, side: Side) -> &RemoteClient {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Mirror one comment event on `issue_key` (on `source_side`) to its
    /// paired issue. Silently no-ops when the issue has no peer yet, or when
    /// the comment is itself a mirrored comment (loop suppression via the
    /// `[JIRA-SYNC]` marker).
    pub async fn sync_comment(
        &self,
        issue_key: &str,
        comment_id: &str,
        source_side: Side,
        event: CommentEvent,
    ) -> Result<(), SyncError> {
        let Some(issue_record) = self.store.find_issue_record_by_key(issue_key, source_side).await? else {
            return Ok(());
        };
        let target_side = source_side.other();
        let Some(target_issue_key) = issue_record.key(target_side).map(str::to_string) else {
            return Ok(());
        };

        let comment_record = self.store.find_comment_by_source(issue_key, comment_id, target_side).await?;

        if event == CommentEvent::Deleted {
            return self.sync_deletion(target_side, &target_issue_key, comment_record).await;
        }

        let comments = self.client(source_side).list_comments(issue_key).await?;
        let Some(source_comment) = comments.into_iter().find(|c| c.id == comment_id) else {
            return Ok(());
        };

        if source_comment.is_sync_comment() {
            return Ok(());
        }

        let source_label = format!("{source_side} ({})", self.client(source_side).project_key());
        let rendered = render_for_mirror(&source_comment, &source_label, event);

        match comment_record {
            Some(record) if record.target_comment_id.is_some() && event == CommentEvent::Created => {
                // Already mirrored; a replayed create must not write again.
            }
            Some(mut record) if record.target_comment_id.is_some() => {
                let target_comment_id = record.target_comment_id.clone().unwrap();
                self.client(target_side).update_comment(&target_issue_key, &target_comment_id, &rendered).await?;
                record.last_sync_timestamp = Utc::now();
                record.status = SyncStatus::Success.to_string();
                self.store.save_comment_record(&record).await?;
            }
            _ => {
                let created = self.client(target_side).create_sync_comment(&target_issue_key, &rendered).await?;
                let record = CommentSyncRecord {
                    sync_id: CommentSyncRecord::sync_id(issue_key, comment_id, target_side),
                    issue_key: issue_key.to_string(),
                    source_comment_id: comment_id.to_string(),
                    target_comment_id: Some(created.id),
                    source_side: source_side.to_string(),
                    target_side: target_side.to_string(),
                    last_sync_timestamp: Utc::now(),
                    sync_direction: Some(source_side.to_string()),
                    status: SyncStatus::Success.to_string(),
                };
                self.store.save_comment_record(&record).await?;
            }
        }

        Ok(())
    }

    async fn sync_deletion(
        &self,
        target_side: Side,
        target_issue_key: &str,
        comment_record: Option<CommentSyncRecord>,
    ) -> Result<(), SyncError> {
        let Some(mut record) = comment_record else { return Ok(()) };
        let Some(target_comment_id) = record.target_comment_id.clone() else { return Ok(()) };

        self.client(target_side).delete_comment(target_issue_key, &target_comment_id).await?;

        record.status = SyncStatus::Success.to_string();
        record.last_sync_timestamp = Utc::now();
        self.store.save_comment_record(&record).await?;
        Ok(())
    }
}

fn render_for_mirror(source_comment: &Comment, source_label: &str, event: CommentEvent) -> String {
    let updated = matches!(event, CommentEvent::Updated).then_some(source_comment.updated);
    Comment::render_sync_body(
        &source_comment.author_name,
        source_comment.author_email.as_deref(),
        &source_comment.id,
        source_label,
        source_comment.created,
        updated,
        &source_comment.body,
    )
}

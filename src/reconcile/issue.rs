//! The Issue Reconciler (C3): webhook-triggered and sweep-triggered issue
//! sync.

use crate::config::SyncConfig;
use crate::db::MappingStore;
use crate::error::SyncError;
use crate::models::{FieldDiff, Issue, IssueSyncRecord, Side, SyncDirection, SyncStatus};
use crate::remote::wire::inflate_rich_text;
use crate::remote::RemoteClient;
use chrono::Utc;

/// Result of one reconciliation attempt: success flag, the record as it now
/// stands, and an optional message plus a flag distinguishing conflicts from
/// plain failures.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub success: bool,
    pub record: IssueSyncRecord,
    pub error_message: Option<String>,
    pub conflicts_detected: bool,
}

impl SyncOutcome {
    fn ok(record: IssueSyncRecord) -> Self {
        Self { success: true, record, error_message: None, conflicts_detected: false }
    }

    fn failed(record: IssueSyncRecord, message: impl Into<String>) -> Self {
        Self { success: false, record, error_message: Some(message.into()), conflicts_detected: false }
    }

    fn conflict(record: IssueSyncRecord, message: impl Into<String>) -> Self {
        Self { success: false, record, error_message: Some(message.into()), conflicts_detected: true }
    }
}

pub struct IssueReconciler {
    left: RemoteClient,
    right: RemoteClient,
    store: MappingStore,
    config: SyncConfig,
}

impl IssueReconciler {
    pub fn new(left: RemoteClient, right: RemoteClient, store: MappingStore, config: SyncConfig) -> Self {
        Self { left, right, store, config }
    }

    fn client(&self, side: Side) -> &RemoteClient {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Entry point for both webhook delivery and sweep traversal.
    pub async fn sync_issue(&self, issue_key: &str, source_side: Side) -> Result<SyncOutcome, SyncError> {
        let source_issue = self.client(source_side).get_issue(issue_key).await?;
        let existing = self.store.find_issue_record_by_key(issue_key, source_side).await?;

        let result = match existing {
            None => self.sync_new_issue(&source_issue, source_side).await,
            Some(record) => self.sync_existing_issue(&source_issue, record, source_side).await,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let mut record = self
                    .store
                    .find_issue_record_by_key(issue_key, source_side)
                    .await?
                    .unwrap_or_else(|| IssueSyncRecord::new_half_formed(issue_key, source_side, source_issue.updated));
                record.status = SyncStatus::Failed.to_string();
                record.error_count += 1;
                record.last_error = Some(err.to_string());
                record.last_sync_timestamp = Utc::now();
                self.store.save_issue_record(&record).await?;
                Ok(SyncOutcome::failed(record, err.to_string()))
            }
        }
    }

    /// Create-Peer: the source issue has no mapping yet, so create it on the
    /// other side and record the new pairing.
    async fn sync_new_issue(&self, source_issue: &Issue, source_side: Side) -> Result<SyncOutcome, SyncError> {
        let target_side = source_side.other();
        let mut record = IssueSyncRecord::new_half_formed(&source_issue.key, source_side, source_issue.updated);
        self.store.save_issue_record(&record).await?;

        let payload = build_create_payload(source_issue, self.client(target_side).project_key(), self.config.sync_assignee);
        let target_issue = match self.client(target_side).create_issue(&payload).await {
            Ok(issue) => issue,
            Err(err) => {
                record.status = SyncStatus::Failed.to_string();
                record.error_count += 1;
                record.last_error = Some(err.to_string());
                self.store.save_issue_record(&record).await?;
                return Err(err);
            }
        };

        record.set_key(target_side, target_issue.key.clone());
        record.set_watermark(target_side, target_issue.updated);
        record.status = SyncStatus::Success.to_string();
        record.last_sync_direction = Some(SyncDirection::from_source(source_side).to_string());
        record.recanonicalize_sync_id();
        self.store.save_issue_record(&record).await?;

        Ok(SyncOutcome::ok(record))
    }

    /// Update-Peer: an existing mapping, so diff and push whatever changed.
    async fn sync_existing_issue(
        &self,
        source_issue: &Issue,
        mut record: IssueSyncRecord,
        source_side: Side,
    ) -> Result<SyncOutcome, SyncError> {
        let target_side = source_side.other();
        let Some(target_key) = record.key(target_side).map(str::to_string) else {
            return Ok(SyncOutcome::failed(record, "target issue key not found in sync record"));
        };

        if let Some(conflict) = self.check_for_conflicts(source_issue, &mut record, source_side, &target_key).await? {
            return Ok(conflict);
        }

        record.status = SyncStatus::InProgress.to_string();
        record.last_sync_timestamp = Utc::now();
        self.store.save_issue_record(&record).await?;

        let sync_result = self.apply_update(source_issue, &target_key, target_side).await;
        match sync_result {
            Ok(updated_watermark) => {
                if let Some(watermark) = updated_watermark {
                    record.set_watermark(target_side, watermark);
                }
                record.set_watermark(source_side, source_issue.updated);
                record.status = SyncStatus::Success.to_string();
                record.last_sync_direction = Some(SyncDirection::from_source(source_side).to_string());
                record.error_count = 0;
                record.last_error = None;
                self.store.save_issue_record(&record).await?;
                Ok(SyncOutcome::ok(record))
            }
            Err(err) => {
                record.status = SyncStatus::Failed.to_string();
                record.error_count += 1;
                record.last_error = Some(err.to_string());
                self.store.save_issue_record(&record).await?;
                Ok(SyncOutcome::failed(record, err.to_string()))
            }
        }
    }

    /// Diff and push; returns the target's fresh `updated` timestamp if a
    /// write happened, or `None` when nothing needed changing. The source
    /// watermark always advances in `sync_existing_issue` regardless of
    /// whether this returns `None`.
    async fn apply_update(&self, source_issue: &Issue, target_key: &str, target_side: Side) -> Result<Option<chrono::DateTime<Utc>>, SyncError> {
        let target_issue = self.client(target_side).get_issue(target_key).await?;
        let diff = Issue::diff(&target_issue, source_issue, self.config.sync_assignee);
        let status_changed = self.config.sync_status_transitions && target_issue.status != source_issue.status;

        if diff.is_empty() && !status_changed {
            return Ok(None);
        }

        if !diff.is_empty() {
            let payload = build_update_payload(&diff);
            self.client(target_side).update_issue(target_key, &payload).await?;
        }
        if status_changed {
            self.client(target_side).transition_to(target_key, &source_issue.status).await?;
        }

        let refreshed = self.client(target_side).get_issue(target_key).await?;
        Ok(Some(refreshed.updated))
    }

    /// Conflict detection: both sides have advanced past their recorded
    /// watermark since the last successful sync.
    async fn check_for_conflicts(
        &self,
        source_issue: &Issue,
        record: &mut IssueSyncRecord,
        source_side: Side,
        target_key: &str,
    ) -> Result<Option<SyncOutcome>, SyncError> {
        let target_side = source_side.other();
        let target_issue = match self.client(target_side).get_issue(target_key).await {
            Ok(issue) => issue,
            Err(_) => return Ok(None),
        };

        let source_last_known = record.watermark(source_side);
        let target_last_known = record.watermark(target_side);

        let source_advanced = source_last_known.map_or(true, |wm| source_issue.updated > wm);
        let target_advanced = target_last_known.map_or(true, |wm| target_issue.updated > wm);

        if source_advanced && target_advanced {
            let details = format!(
                "Both issues updated since last sync. Source ({}) updated: {}, Target ({}) updated: {}, Last sync: {}",
                source_issue.key, source_issue.updated, target_key, target_issue.updated, record.last_sync_timestamp,
            );
            record.status = SyncStatus::Conflict.to_string();
            record.requires_manual_resolution = true;
            record.conflict_details = Some(details.clone());
            record.last_sync_timestamp = Utc::now();
            self.store.save_issue_record(record).await?;
            return Ok(Some(SyncOutcome::conflict(record.clone(), details)));
        }

        Ok(None)
    }

    /// Manually resolve a conflict by declaring which side is authoritative.
    pub async fn resolve_conflict(&self, sync_id: &str, source_side: Side) -> Result<SyncOutcome, SyncError> {
        let mut record = self.store.get_issue_record(sync_id).await?.ok_or_else(|| SyncError::not_found(sync_id))?;
        if record.status_enum() != SyncStatus::Conflict {
            return Err(SyncError::invalid_input(format!("sync record {sync_id} is not in conflict state")));
        }

        let source_key = record.key(source_side).ok_or_else(|| SyncError::invalid_input("source key not found in sync record"))?.to_string();

        record.status = SyncStatus::Pending.to_string();
        record.requires_manual_resolution = false;
        record.conflict_details = None;
        self.store.save_issue_record(&record).await?;

        let source_issue = self.client(source_side).get_issue(&source_key).await?;
        self.sync_existing_issue(&source_issue, record, source_side).await
    }

    /// Sweep every issue in the Left project, then every not-yet-mapped
    /// issue in the Right project.
    pub async fn full_sync(&self) -> Result<Vec<SyncOutcome>, SyncError> {
        let mut results = Vec::new();

        let left_keys = self.search_project_keys(Side::Left).await?;
        for key in left_keys {
            results.push(self.sync_issue(&key, Side::Left).await?);
        }

        let right_keys = self.search_project_keys(Side::Right).await?;
        for key in right_keys {
            if self.store.find_issue_record_by_key(&key, Side::Right).await?.is_none() {
                results.push(self.sync_issue(&key, Side::Right).await?);
            }
        }

        Ok(results)
    }

    async fn search_project_keys(&self, side: Side) -> Result<Vec<String>, SyncError> {
        let project_key = self.client(side).project_key().to_string();
        let issues = self.client(side).search_issues(&project_key).await?;
        Ok(issues.into_iter().map(|issue| issue.key).collect())
    }

    /// Retry every record in `Failed` status that hasn't exhausted
    /// `max_retries`.
    pub async fn retry_failed_syncs(&self) -> Result<Vec<SyncOutcome>, SyncError> {
        let failed = self.store.list_issue_records_by_status(SyncStatus::Failed).await?;
        let mut results = Vec::new();

        for record in failed {
            if record.error_count as u32 >= self.config.max_retries {
                continue;
            }

            let direction = record.direction_enum();
            let (source_side, source_key) = match direction {
                Some(dir) => (dir.source_side(), record.key(dir.source_side()).map(str::to_string)),
                None => match (record.left_key.clone(), record.right_key.clone()) {
                    (Some(key), _) => (Side::Left, Some(key)),
                    (None, Some(key)) => (Side::Right, Some(key)),
                    (None, None) => (Side::Left, None),
                },
            };

            let Some(source_key) = source_key else { continue };
            results.push(self.sync_issue(&source_key, source_side).await?);
            tokio::time::sleep(self.config.retry_delay).await;
        }

        Ok(results)
    }
}

/// Build the wire payload for creating a new issue on `target_project_key`
/// mirroring `source`.
fn build_create_payload(source: &Issue, target_project_key: &str, sync_assignee: bool) -> serde_json::Value {
    let mut fields = serde_json::json!({
        "project": { "key": target_project_key },
        "summary": source.summary,
        "issuetype": { "name": source.issue_type },
        "priority": { "name": source.priority },
        "labels": source.labels,
        "components": source.components.iter().map(|c| serde_json::json!({"name": c})).collect::<Vec<_>>(),
        "fixVersions": source.fix_versions.iter().map(|v| serde_json::json!({"name": v})).collect::<Vec<_>>(),
    });

    if let Some(description) = &source.description {
        fields["description"] = serde_json::to_value(inflate_rich_text(description)).unwrap_or(serde_json::Value::Null);
    }
    if sync_assignee {
        if let Some(assignee) = &source.assignee {
            fields["assignee"] = serde_json::json!({ "emailAddress": assignee });
        }
    }
    for (key, value) in &source.custom_fields {
        fields[key] = value.clone();
    }

    serde_json::json!({ "fields": fields })
}

/// Build the wire payload carrying only the fields in `diff`. Status is
/// never included here.
fn build_update_payload(diff: &FieldDiff) -> serde_json::Value {
    let mut fields = serde_json::Map::new();

    if let Some(summary) = &diff.summary {
        fields.insert("summary".into(), serde_json::json!(summary));
    }
    if let Some(description) = &diff.description {
        let value = match description {
            Some(text) => serde_json::to_value(inflate_rich_text(text)).unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Null,
        };
        fields.insert("description".into(), value);
    }
    if let Some(priority) = &diff.priority {
        fields.insert("priority".into(), serde_json::json!({ "name": priority }));
    }
    if let Some(labels) = &diff.labels {
        fields.insert("labels".into(), serde_json::json!(labels));
    }
    if let Some(components) = &diff.components {
        fields.insert("components".into(), serde_json::json!(components.iter().map(|c| serde_json::json!({"name": c})).collect::<Vec<_>>()));
    }
    if let Some(fix_versions) = &diff.fix_versions {
        fields.insert("fixVersions".into(), serde_json::json!(fix_versions.iter().map(|v| serde_json::json!({"name": v})).collect::<Vec<_>>()));
    }
    if let Some(assignee) = &diff.assignee {
        let value = match assignee {
            Some(email) => serde_json::json!({ "emailAddress": email }),
            None => serde_json::Value::Null,
        };
        fields.insert("assignee".into(), value);
    }
    for (key, value) in &diff.custom_fields {
        fields.insert(key.clone(), value.clone());
    }

    serde_json::json!({ "fields": fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_issue() -> Issue {
        Issue {
            key: "PROJ-1".into(),
            summary: "Hello".into(),
            description: None,
            issue_type: "Task".into(),
            status: "To Do".into(),
            priority: "Medium".into(),
            assignee: None,
            reporter: "a@example.com".into(),
            labels: vec!["x".into()],
            components: vec![],
            fix_versions: vec![],
            custom_fields: HashMap::new(),
            created: Utc::now(),
            updated: Utc::now(),
            resolution: None,
            comments: None,
        }
    }

    #[test]
    fn create_payload_includes_project_key_and_summary() {
        let issue = base_issue();
        let payload = build_create_payload(&issue, "TARGET", false);
        assert_eq!(payload["fields"]["project"]["key"], "TARGET");
        assert_eq!(payload["fields"]["summary"], "Hello");
        assert!(payload["fields"].get("assignee").is_none());
    }

    #[test]
    fn create_payload_includes_assignee_when_enabled() {
        let mut issue = base_issue();
        issue.assignee = Some("bob@example.com".into());
        let payload = build_create_payload(&issue, "TARGET", true);
        assert_eq!(payload["fields"]["assignee"]["emailAddress"], "bob@example.com");
    }

    #[test]
    fn update_payload_only_carries_diffed_fields() {
        let diff = FieldDiff { summary: Some("New".into()), ..Default::default() };
        let payload = build_update_payload(&diff);
        assert_eq!(payload["fields"]["summary"], "New");
        assert!(payload["fields"].get("priority").is_none());
    }

    #[test]
    fn update_payload_is_empty_fields_when_diff_empty() {
        let diff = FieldDiff::default();
        let payload = build_update_payload(&diff);
        assert_eq!(payload["fields"].as_object().unwrap().len(), 0);
    }
}

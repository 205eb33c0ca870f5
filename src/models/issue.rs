use super::Comment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The sync engine's internal representation of an issue, independent of
/// the remote's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
    pub assignee: Option<String>,
    pub reporter: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub fix_versions: Vec<String>,
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub resolution: Option<String>,
    #[serde(default)]
    pub comments: Option<Vec<Comment>>,
}

/// Fields that differ between two issues and must be pushed to the peer.
/// Every entry present is a field to write.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldDiff {
    pub summary: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<String>,
    pub labels: Option<Vec<String>>,
    pub components: Option<Vec<String>>,
    pub fix_versions: Option<Vec<String>>,
    pub assignee: Option<Option<String>>,
    pub custom_fields: HashMap<String, serde_json::Value>,
}

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.labels.is_none()
            && self.components.is_none()
            && self.fix_versions.is_none()
            && self.assignee.is_none()
            && self.custom_fields.is_empty()
    }
}

fn as_set(items: &[String]) -> std::collections::BTreeSet<&str> {
    items.iter().map(String::as_str).collect()
}

impl Issue {
    /// Compute the field-set that differs between `current` (the target's
    /// present state) and `target` (the source we want the peer to match).
    /// Set-valued fields compare as sets.
    pub fn diff(current: &Issue, target: &Issue, sync_assignee: bool) -> FieldDiff {
        let mut diff = FieldDiff::default();

        if current.summary != target.summary {
            diff.summary = Some(target.summary.clone());
        }
        if current.description != target.description {
            diff.description = Some(target.description.clone());
        }
        if current.priority != target.priority {
            diff.priority = Some(target.priority.clone());
        }
        if as_set(&current.labels) != as_set(&target.labels) {
            diff.labels = Some(target.labels.clone());
        }
        if as_set(&current.components) != as_set(&target.components) {
            diff.components = Some(target.components.clone());
        }
        if as_set(&current.fix_versions) != as_set(&target.fix_versions) {
            diff.fix_versions = Some(target.fix_versions.clone());
        }
        if sync_assignee && current.assignee != target.assignee {
            diff.assignee = Some(target.assignee.clone());
        }
        for (key, value) in &target.custom_fields {
            if current.custom_fields.get(key) != Some(value) {
                diff.custom_fields.insert(key.clone(), value.clone());
            }
        }

        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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
            labels: vec![],
            components: vec![],
            fix_versions: vec![],
            custom_fields: HashMap::new(),
            created: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            resolution: None,
            comments: None,
        }
    }

    #[test]
    fn no_diff_when_identical() {
        let a = base_issue();
        let b = base_issue();
        assert!(Issue::diff(&a, &b, false).is_empty());
    }

    #[test]
    fn label_set_equality_ignores_order() {
        let mut a = base_issue();
        a.labels = vec!["x".into(), "y".into()];
        let mut b = base_issue();
        b.labels = vec!["y".into(), "x".into()];
        assert!(Issue::diff(&a, &b, false).is_empty());
    }

    #[test]
    fn summary_change_is_diffed() {
        let a = base_issue();
        let mut b = base_issue();
        b.summary = "Goodbye".into();
        let diff = Issue::diff(&a, &b, false);
        assert_eq!(diff.summary, Some("Goodbye".into()));
    }

    #[test]
    fn assignee_diff_respects_sync_flag() {
        let a = base_issue();
        let mut b = base_issue();
        b.assignee = Some("x@example.com".into());

        assert!(Issue::diff(&a, &b, false).assignee.is_none());
        assert_eq!(Issue::diff(&a, &b, true).assignee, Some(Some("x@example.com".into())));
    }

    #[test]
    fn custom_field_changes_are_tracked_by_key() {
        let mut a = base_issue();
        a.custom_fields.insert("customfield_100".into(), serde_json::json!("old"));
        let mut b = base_issue();
        b.custom_fields.insert("customfield_100".into(), serde_json::json!("new"));
        b.custom_fields.insert("customfield_200".into(), serde_json::json!(42));

        let diff = Issue::diff(&a, &b, false);
        assert_eq!(diff.custom_fields.get("customfield_100"), Some(&serde_json::json!("new")));
        assert_eq!(diff.custom_fields.get("customfield_200"), Some(&serde_json::json!(42)));
    }
}

use chrono::{DateTime, Utc};
use ticket_bridge::config::{RemoteConfig, SyncConfig};
use ticket_bridge::db::{create_pool, MappingStore};
use ticket_bridge::remote::RemoteClient;

pub async fn test_store() -> MappingStore {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(&dir.path().join("sync.db")).await.unwrap();
    std::mem::forget(dir);
    MappingStore::new(pool)
}

pub fn remote_config(base_url: &str, project_key: &str) -> RemoteConfig {
    RemoteConfig {
        base_url: base_url.to_string(),
        username: "bot".to_string(),
        api_token: "token".to_string(),
        project_key: project_key.to_string(),
    }
}

pub fn remote_client(base_url: &str, project_key: &str) -> RemoteClient {
    RemoteClient::new(&remote_config(base_url, project_key)).unwrap()
}

pub fn sync_config(left_url: &str, right_url: &str) -> SyncConfig {
    SyncConfig {
        left: remote_config(left_url, "LEFT"),
        right: remote_config(right_url, "RIGHT"),
        db_path: "unused.db".to_string(),
        webhook_secret: "shh".to_string(),
        sync_interval: std::time::Duration::from_secs(300),
        max_retries: 3,
        retry_delay: std::time::Duration::from_millis(1),
        sync_status_transitions: true,
        sync_assignee: false,
        sync_comments: true,
        bind_addr: "0.0.0.0:0".to_string(),
    }
}

/// Minimal Jira-shaped issue payload, enough for `WireIssue` deserialization.
pub fn issue_json(key: &str, summary: &str, status: &str, updated: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "key": key,
        "fields": {
            "summary": summary,
            "issuetype": { "name": "Task" },
            "status": { "name": status },
            "priority": { "name": "Medium" },
            "labels": [],
            "created": updated.to_rfc3339(),
            "updated": updated.to_rfc3339(),
        }
    })
}

pub fn comment_json(id: &str, body: &str, author: &str, email: &str, when: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "body": {
            "type": "doc",
            "version": 1,
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": body }] }
            ]
        },
        "author": { "displayName": author, "emailAddress": email },
        "created": when.to_rfc3339(),
        "updated": when.to_rfc3339(),
    })
}

use super::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of an Issue or Comment Sync Record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Conflict,
}

impl From<&str> for SyncStatus {
    fn from(s: &str) -> Self {
        match s {
            "in_progress" => SyncStatus::InProgress,
            "success" => SyncStatus::Success,
            "failed" => SyncStatus::Failed,
            "conflict" => SyncStatus::Conflict,
            _ => SyncStatus::Pending,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Pending => "pending",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
            SyncStatus::Conflict => "conflict",
        };
        write!(f, "{s}")
    }
}

/// Direction of the most recent successful sync for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    LeftToRight,
    RightToLeft,
}

impl SyncDirection {
    pub fn from_source(source_side: Side) -> Self {
        match source_side {
            Side::Left => SyncDirection::LeftToRight,
            Side::Right => SyncDirection::RightToLeft,
        }
    }

    pub fn source_side(self) -> Side {
        match self {
            SyncDirection::LeftToRight => Side::Left,
            SyncDirection::RightToLeft => Side::Right,
        }
    }
}

impl From<&str> for SyncDirection {
    fn from(s: &str) -> Self {
        match s {
            "right_to_left" => SyncDirection::RightToLeft,
            _ => SyncDirection::LeftToRight,
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncDirection::LeftToRight => "left_to_right",
            SyncDirection::RightToLeft => "right_to_left",
        };
        write!(f, "{s}")
    }
}

/// One row of the Mapping Store's primary table.
#[derive(Debug, Clone, FromRow)]
pub struct IssueSyncRecord {
    pub sync_id: String,
    pub left_key: Option<String>,
    pub right_key: Option<String>,
    pub status: String,
    pub last_sync_direction: Option<String>,
    pub last_sync_timestamp: DateTime<Utc>,
    pub left_last_updated: Option<DateTime<Utc>>,
    pub right_last_updated: Option<DateTime<Utc>>,
    pub error_count: i64,
    pub last_error: Option<String>,
    pub requires_manual_resolution: bool,
    pub conflict_details: Option<String>,
}

impl IssueSyncRecord {
    pub fn new_half_formed(key: &str, source_side: Side, watermark: DateTime<Utc>) -> Self {
        let mut record = Self {
            sync_id: format!("{key}#unknown"),
            left_key: None,
            right_key: None,
            status: SyncStatus::InProgress.to_string(),
            last_sync_direction: None,
            last_sync_timestamp: Utc::now(),
            left_last_updated: None,
            right_last_updated: None,
            error_count: 0,
            last_error: None,
            requires_manual_resolution: false,
            conflict_details: None,
        };
        record.set_key(source_side, key.to_string());
        record.set_watermark(source_side, watermark);
        record
    }

    pub fn status_enum(&self) -> SyncStatus {
        SyncStatus::from(self.status.as_str())
    }

    pub fn direction_enum(&self) -> Option<SyncDirection> {
        self.last_sync_direction.as_deref().map(SyncDirection::from)
    }

    pub fn key(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.left_key.as_deref(),
            Side::Right => self.right_key.as_deref(),
        }
    }

    pub fn set_key(&mut self, side: Side, key: String) {
        match side {
            Side::Left => self.left_key = Some(key),
            Side::Right => self.right_key = Some(key),
        }
    }

    pub fn watermark(&self, side: Side) -> Option<DateTime<Utc>> {
        match side {
            Side::Left => self.left_last_updated,
            Side::Right => self.right_last_updated,
        }
    }

    pub fn set_watermark(&mut self, side: Side, when: DateTime<Utc>) {
        match side {
            Side::Left => self.left_last_updated = Some(when),
            Side::Right => self.right_last_updated = Some(when),
        }
    }

    /// Recompute `sync_id` from the current key pair once both sides of a
    /// pairing are known.
    pub fn recanonicalize_sync_id(&mut self) {
        self.sync_id = format!(
            "{}#{}",
            self.left_key.as_deref().unwrap_or("unknown"),
            self.right_key.as_deref().unwrap_or("unknown"),
        );
    }
}

/// One row of the Mapping Store's comment table.
#[derive(Debug, Clone, FromRow)]
pub struct CommentSyncRecord {
    pub sync_id: String,
    pub issue_key: String,
    pub source_comment_id: String,
    pub target_comment_id: Option<String>,
    pub source_side: String,
    pub target_side: String,
    pub last_sync_timestamp: DateTime<Utc>,
    pub sync_direction: Option<String>,
    pub status: String,
}

impl CommentSyncRecord {
    pub fn sync_id(issue_key: &str, source_comment_id: &str, target_side: Side) -> String {
        format!("{issue_key}#{source_comment_id}#{target_side}")
    }

    pub fn status_enum(&self) -> SyncStatus {
        SyncStatus::from(self.status.as_str())
    }
}

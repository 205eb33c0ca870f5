use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SYNC_MARKER: &str = "[JIRA-SYNC]";

/// The sync engine's internal representation of a public comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Comment {
    /// True iff the body begins with the literal `[JIRA-SYNC]` marker on its
    /// first non-whitespace line. Such a comment is never mirrored.
    pub fn is_sync_comment(&self) -> bool {
        self.body.trim_start().starts_with(SYNC_MARKER)
    }

    /// Parse the `Source ID: <id>` line out of a marker block, if present.
    pub fn sync_source_id(&self) -> Option<&str> {
        self.marker_field("Source ID")
    }

    /// Parse the `Original author: <name>[ (<email>)]` line out of a marker
    /// block, returning just the display name portion.
    pub fn original_author(&self) -> Option<&str> {
        self.marker_field("Original author").map(|v| v.split(" (").next().unwrap_or(v))
    }

    fn marker_field<'a>(&'a self, label: &str) -> Option<&'a str> {
        if !self.is_sync_comment() {
            return None;
        }
        let prefix = format!("{SYNC_MARKER} {label}: ");
        self.body.lines().find_map(|line| line.strip_prefix(prefix.as_str()))
    }

    /// Render the `[JIRA-SYNC]` attribution header plus the verbatim source
    /// body. `updated` is only emitted on the re-render of an edited
    /// comment.
    pub fn render_sync_body(
        author_display: &str,
        author_email: Option<&str>,
        source_id: &str,
        source_label: &str,
        created: DateTime<Utc>,
        updated: Option<DateTime<Utc>>,
        body: &str,
    ) -> String {
        let mut header = String::new();
        match author_email {
            Some(email) => header.push_str(&format!("{SYNC_MARKER} Original author: {author_display} ({email})\n")),
            None => header.push_str(&format!("{SYNC_MARKER} Original author: {author_display}\n")),
        }
        header.push_str(&format!("{SYNC_MARKER} Source ID: {source_id}\n"));
        header.push_str(&format!("{SYNC_MARKER} From: {source_label}\n"));
        header.push_str(&format!("{SYNC_MARKER} Created: {}\n", created.format("%Y-%m-%d %H:%M:%S UTC")));
        if let Some(updated) = updated {
            header.push_str(&format!("{SYNC_MARKER} Updated: {}\n", updated.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        format!("{header}\n---\n\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn detects_marker_prefix() {
        let comment = Comment {
            id: "1".into(),
            body: "[JIRA-SYNC] Original author: Jane\nhello".into(),
            author_name: "bot".into(),
            author_email: None,
            created: Utc::now(),
            updated: Utc::now(),
        };
        assert!(comment.is_sync_comment());
    }

    #[test]
    fn ignores_marker_not_at_start() {
        let comment = Comment {
            id: "1".into(),
            body: "hi [JIRA-SYNC] not a real marker".into(),
            author_name: "bot".into(),
            author_email: None,
            created: Utc::now(),
            updated: Utc::now(),
        };
        assert!(!comment.is_sync_comment());
    }

    #[test]
    fn renders_and_parses_round_trip() {
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let rendered = Comment::render_sync_body(
            "Jane Doe",
            Some("jane@example.com"),
            "10042",
            "left (https://left.example.com)",
            created,
            None,
            "Hi there",
        );
        let comment = Comment {
            id: "99".into(),
            body: rendered,
            author_name: "bot".into(),
            author_email: None,
            created,
            updated: created,
        };
        assert!(comment.is_sync_comment());
        assert_eq!(comment.sync_source_id(), Some("10042"));
        assert_eq!(comment.original_author(), Some("Jane Doe"));
        assert!(comment.body.ends_with("Hi there"));
    }

    #[test]
    fn updated_stamp_only_present_on_edited_render() {
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let updated = Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap();
        let rendered = Comment::render_sync_body("Jane", None, "1", "left", created, Some(updated), "edited body");
        assert!(rendered.contains("Updated: 2026-01-03"));
    }
}

//! Wire-format structs for the remote ticketing HTTP API, and the
//! flatten/inflate conversions to and from the normalized models.
//!
//! Rich text on the wire is a `doc -> paragraph -> text` tree; the
//! normalized model only ever sees flat strings.

use crate::models::{Comment, Issue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct WireIssue {
    pub key: String,
    pub fields: WireIssueFields,
}

#[derive(Debug, Deserialize)]
pub struct WireIssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<RichText>,
    #[serde(default)]
    pub issuetype: NamedRef,
    #[serde(default)]
    pub status: NamedRef,
    #[serde(default)]
    pub priority: NamedRef,
    #[serde(default)]
    pub assignee: Option<PersonRef>,
    #[serde(default)]
    pub reporter: Option<PersonRef>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<NamedRef>,
    #[serde(default, rename = "fixVersions")]
    pub fix_versions: Vec<NamedRef>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution: Option<NamedRef>,
    #[serde(flatten)]
    pub rest: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PersonRef {
    #[serde(rename = "emailAddress")]
    pub email_address: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// `doc -> paragraph -> text` rich-text tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub content: Vec<RichTextNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub content: Vec<RichTextLeaf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichTextLeaf {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub text: String,
}

/// Flatten a `doc -> paragraph -> text` tree into a plain string: every
/// paragraph's text runs concatenated by single spaces, paragraphs joined
/// the same way.
pub fn flatten_rich_text(doc: &RichText) -> String {
    doc.content
        .iter()
        .map(|paragraph| {
            paragraph
                .content
                .iter()
                .map(|leaf| leaf.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Re-inflate plain text into the single-paragraph rich-text shape expected
/// on write.
pub fn inflate_rich_text(text: &str) -> RichText {
    RichText {
        node_type: "doc".into(),
        version: 1,
        content: vec![RichTextNode {
            node_type: "paragraph".into(),
            content: vec![RichTextLeaf { node_type: "text".into(), text: text.to_string() }],
        }],
    }
}

impl From<WireIssue> for Issue {
    fn from(wire: WireIssue) -> Self {
        let fields = wire.fields;
        let description = fields.description.as_ref().map(flatten_rich_text).filter(|s| !s.is_empty());
        let assignee = fields.assignee.and_then(|a| a.email_address.or(a.display_name));
        let reporter = fields.reporter.and_then(|r| r.email_address.or(r.display_name)).unwrap_or_default();
        let custom_fields = fields
            .rest
            .into_iter()
            .filter(|(k, v)| k.starts_with("customfield_") && !v.is_null())
            .collect();

        Issue {
            key: wire.key,
            summary: fields.summary,
            description,
            issue_type: fields.issuetype.name,
            status: fields.status.name,
            priority: fields.priority.name,
            assignee,
            reporter,
            labels: fields.labels,
            components: fields.components.into_iter().map(|c| c.name).collect(),
            fix_versions: fields.fix_versions.into_iter().map(|v| v.name).collect(),
            custom_fields,
            created: fields.created.unwrap_or_else(Utc::now),
            updated: fields.updated.unwrap_or_else(Utc::now),
            resolution: fields.resolution.map(|r| r.name),
            comments: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireComment {
    pub id: String,
    pub body: RichText,
    pub author: Option<PersonRef>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<WireComment> for Comment {
    fn from(wire: WireComment) -> Self {
        let author = wire.author;
        Comment {
            id: wire.id,
            body: flatten_rich_text(&wire.body),
            author_name: author.as_ref().and_then(|a| a.display_name.clone()).unwrap_or_default(),
            author_email: author.and_then(|a| a.email_address),
            created: wire.created,
            updated: wire.updated,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireTransition {
    pub id: String,
    pub to: NamedRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_all_paragraphs_joined_by_space() {
        let doc = RichText {
            node_type: "doc".into(),
            version: 1,
            content: vec![
                RichTextNode { node_type: "paragraph".into(), content: vec![RichTextLeaf { node_type: "text".into(), text: "Hello".into() }] },
                RichTextNode { node_type: "paragraph".into(), content: vec![RichTextLeaf { node_type: "text".into(), text: "world".into() }] },
            ],
        };
        assert_eq!(flatten_rich_text(&doc), "Hello world");
    }

    #[test]
    fn flattens_multiple_text_runs_within_one_paragraph() {
        let doc = RichText {
            node_type: "doc".into(),
            version: 1,
            content: vec![RichTextNode {
                node_type: "paragraph".into(),
                content: vec![
                    RichTextLeaf { node_type: "text".into(), text: "foo".into() },
                    RichTextLeaf { node_type: "text".into(), text: "bar".into() },
                ],
            }],
        };
        assert_eq!(flatten_rich_text(&doc), "foo bar");
    }

    #[test]
    fn inflate_produces_single_paragraph_doc() {
        let doc = inflate_rich_text("hello");
        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.content[0].content[0].text, "hello");
    }

    #[test]
    fn wire_issue_maps_custom_fields_and_drops_nulls() {
        let json = serde_json::json!({
            "key": "PROJ-1",
            "fields": {
                "summary": "Hello",
                "issuetype": {"name": "Task"},
                "status": {"name": "To Do"},
                "priority": {"name": "Medium"},
                "labels": ["a", "b"],
                "customfield_100": "value",
                "customfield_200": null,
                "created": "2026-01-01T00:00:00Z",
                "updated": "2026-01-02T00:00:00Z"
            }
        });
        let wire: WireIssue = serde_json::from_value(json).unwrap();
        let issue: Issue = wire.into();
        assert_eq!(issue.key, "PROJ-1");
        assert_eq!(issue.custom_fields.get("customfield_100"), Some(&serde_json::json!("value")));
        assert!(!issue.custom_fields.contains_key("customfield_200"));
    }
}

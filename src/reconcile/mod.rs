//! Reconcilers: the Issue Reconciler (C3) and Comment Reconciler (C4).

pub mod comment;
pub mod issue;

pub use comment::CommentReconciler;
pub use issue::{IssueReconciler, SyncOutcome};

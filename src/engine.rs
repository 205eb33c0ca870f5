//! Process-wide holder of the configured clients, store, and reconcilers,
//! built once at startup and shared by every dispatcher route.

use crate::config::SyncConfig;
use crate::db::{create_pool, MappingStore};
use crate::error::SyncError;
use crate::reconcile::{CommentReconciler, IssueReconciler};
use crate::remote::RemoteClient;
use std::sync::Arc;

pub struct Engine {
    pub config: SyncConfig,
    pub store: MappingStore,
    pub issues: IssueReconciler,
    pub comments: CommentReconciler,
}

impl Engine {
    pub async fn build(config: SyncConfig) -> Result<Self, SyncError> {
        let pool = create_pool(std::path::Path::new(&config.db_path)).await?;
        let store = MappingStore::new(pool);

        let left = RemoteClient::new(&config.left)?;
        let right = RemoteClient::new(&config.right)?;

        let issues = IssueReconciler::new(left.clone(), right.clone(), store.clone(), config.clone());
        let comments = CommentReconciler::new(left, right, store.clone());

        Ok(Self { config, store, issues, comments })
    }
}

/// Shared handle installed once by `main`, read by every dispatcher route.
pub type SharedEngine = Arc<Engine>;

//! Error taxonomy for the sync engine.
//!
//! Mirrors the error kinds a single webhook or sweep can surface: transient
//! remote failures, permanent remote rejections, storage failures, caller
//! input validation, and internal bugs. Serializes to the `{error, message}`
//! shape the dispatcher returns to callers.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote API error ({status_code:?}): {message}")]
    RemoteApi {
        message: String,
        status_code: Option<u16>,
        endpoint: Option<String>,
    },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String, field: Option<String> },

    #[error("sync record not found: {sync_id}")]
    NotFound { sync_id: String },

    #[error("conflict on {sync_id}: {details}")]
    Conflict { sync_id: String, details: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    pub fn remote_api(message: impl Into<String>, status_code: Option<u16>, endpoint: impl Into<String>) -> Self {
        Self::RemoteApi {
            message: message.into(),
            status_code,
            endpoint: Some(endpoint.into()),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into(), field: None }
    }

    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into(), field: Some(field.into()) }
    }

    pub fn not_found(sync_id: impl Into<String>) -> Self {
        Self::NotFound { sync_id: sync_id.into() }
    }

    pub fn conflict(sync_id: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Conflict { sync_id: sync_id.into(), details: details.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// HTTP status this error maps to when returned from a dispatcher handler.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RemoteApi { .. } | Self::Network { .. } | Self::Storage { .. } | Self::Internal { .. } => 500,
            Self::InvalidInput { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::RemoteApi { .. } => "remote_api",
            Self::Network { .. } => "network",
            Self::Storage { .. } => "storage",
            Self::InvalidInput { .. } => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal",
        }
    }
}

impl Serialize for SyncError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SyncError", 2)?;
        state.serialize_field("error", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::network(err.to_string())
        } else if let Some(status) = err.status() {
            Self::remote_api(err.to_string(), Some(status.as_u16()), err.url().map(|u| u.to_string()).unwrap_or_default())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_input(err.to_string())
    }
}

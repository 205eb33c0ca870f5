//! HTTP client for one remote ticketing instance (C1).

use super::wire::{WireComment, WireIssue, WireTransition};
use crate::config::RemoteConfig;
use crate::error::SyncError;
use crate::models::{Comment, Issue};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_CUMULATIVE_RETRY_WAIT_SECS: u64 = 120;

/// Authenticated HTTP client for a single remote, with retry/backoff on
/// transient failures.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    project_key: String,
    username: String,
    api_token: String,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_key: config.project_key.clone(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Apply HTTP Basic auth (username + API token) the same way on every
    /// request.
    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.username, Some(&self.api_token))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/3{}", self.base_url, path)
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Issue a request with retry/backoff: up to `MAX_RETRIES` attempts, 429
    /// responses sleep for `Retry-After` (capped so the cumulative wait
    /// across attempts never exceeds `MAX_CUMULATIVE_RETRY_WAIT_SECS`),
    /// transport failures back off `2^attempt` seconds, any other non-2xx
    /// fails fast.
    async fn send_with_retry<F>(&self, endpoint: &str, build: F) -> Result<Response, SyncError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut cumulative_wait = Duration::ZERO;

        for attempt in 0..MAX_RETRIES {
            let outcome = build().send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS && attempt + 1 < MAX_RETRIES {
                        let remaining = Duration::from_secs(MAX_CUMULATIVE_RETRY_WAIT_SECS.saturating_sub(cumulative_wait.as_secs()));
                        let wait = retry_after(&response).unwrap_or_else(|| Duration::from_secs(2u64.pow(attempt))).min(remaining);
                        cumulative_wait += wait;
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return Err(SyncError::remote_api(
                        format!("request to {endpoint} failed with status {status}"),
                        Some(status.as_u16()),
                        endpoint,
                    ));
                }
                Err(_) if attempt + 1 < MAX_RETRIES => {
                    let wait = Duration::from_secs(2u64.pow(attempt));
                    cumulative_wait += wait;
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(err) => return Err(SyncError::from(err)),
            }
        }

        Err(SyncError::remote_api(format!("exhausted retries against {endpoint}"), None, endpoint))
    }

    pub async fn get_issue(&self, key: &str) -> Result<Issue, SyncError> {
        let endpoint = format!("/issue/{key}");
        let url = self.api_url(&endpoint);
        let response = self.send_with_retry(&endpoint, || self.authed(self.client.get(&url))).await?;
        let wire: WireIssue = response.json().await?;
        Ok(wire.into())
    }

    pub async fn create_issue(&self, payload: &serde_json::Value) -> Result<Issue, SyncError> {
        let endpoint = "/issue".to_string();
        let url = self.api_url(&endpoint);
        let response = self.send_with_retry(&endpoint, || self.authed(self.client.post(&url)).json(payload)).await?;
        let wire: WireIssue = response.json().await?;
        Ok(wire.into())
    }

    /// Update the non-status fields of an issue. Status always moves
    /// through a separate transition call.
    pub async fn update_issue(&self, key: &str, payload: &serde_json::Value) -> Result<(), SyncError> {
        let endpoint = format!("/issue/{key}");
        let url = self.api_url(&endpoint);
        self.send_with_retry(&endpoint, || self.authed(self.client.put(&url)).json(payload)).await?;
        Ok(())
    }

    /// Search issues by JQL-style query.
    pub async fn search_issues(&self, project_key: &str) -> Result<Vec<Issue>, SyncError> {
        #[derive(Serialize)]
        struct SearchRequest<'a> {
            jql: String,
            #[serde(rename = "startAt")]
            start_at: u32,
            #[serde(rename = "maxResults")]
            max_results: u32,
            fields: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct SearchResponse {
            issues: Vec<WireIssue>,
        }

        let endpoint = "/search".to_string();
        let url = self.api_url(&endpoint);
        let body = SearchRequest { jql: format!("project = \"{project_key}\""), start_at: 0, max_results: 1000, fields: "*all" };
        let response = self.send_with_retry(&endpoint, || self.authed(self.client.post(&url)).json(&body)).await?;
        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.issues.into_iter().map(Issue::from).collect())
    }

    pub async fn list_transitions(&self, key: &str) -> Result<Vec<WireTransition>, SyncError> {
        #[derive(serde::Deserialize)]
        struct TransitionsResponse {
            transitions: Vec<WireTransition>,
        }
        let endpoint = format!("/issue/{key}/transitions");
        let url = self.api_url(&endpoint);
        let response = self.send_with_retry(&endpoint, || self.authed(self.client.get(&url))).await?;
        let body: TransitionsResponse = response.json().await?;
        Ok(body.transitions)
    }

    async fn transition_issue(&self, key: &str, transition_id: &str) -> Result<(), SyncError> {
        #[derive(Serialize)]
        struct Transition<'a> {
            id: &'a str,
        }
        #[derive(Serialize)]
        struct Body<'a> {
            transition: Transition<'a>,
        }

        let endpoint = format!("/issue/{key}/transitions");
        let url = self.api_url(&endpoint);
        let body = Body { transition: Transition { id: transition_id } };
        self.send_with_retry(&endpoint, || self.authed(self.client.post(&url)).json(&body)).await?;
        Ok(())
    }

    /// Move `key` to the transition whose target status name matches
    /// `target_status_name`, if one exists among the issue's available
    /// transitions. Returns `Ok(false)` without error when no such
    /// transition exists.
    pub async fn transition_to(&self, key: &str, target_status_name: &str) -> Result<bool, SyncError> {
        let transitions = self.list_transitions(key).await?;
        let matching = transitions.iter().find(|t| t.to.name.eq_ignore_ascii_case(target_status_name));
        match matching {
            Some(t) => {
                self.transition_issue(key, &t.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn list_comments(&self, key: &str) -> Result<Vec<Comment>, SyncError> {
        #[derive(serde::Deserialize)]
        struct CommentsResponse {
            comments: Vec<WireComment>,
        }
        let endpoint = format!("/issue/{key}/comment");
        let url = self.api_url(&endpoint);
        let response = self.send_with_retry(&endpoint, || self.authed(self.client.get(&url))).await?;
        let body: CommentsResponse = response.json().await?;
        Ok(body.comments.into_iter().map(Comment::from).collect())
    }

    pub async fn create_comment(&self, key: &str, body: &str) -> Result<Comment, SyncError> {
        let endpoint = format!("/issue/{key}/comment");
        let url = self.api_url(&endpoint);
        let payload = serde_json::json!({ "body": super::wire::inflate_rich_text(body) });
        let response = self.send_with_retry(&endpoint, || self.authed(self.client.post(&url)).json(&payload)).await?;
        let wire: WireComment = response.json().await?;
        Ok(wire.into())
    }

    pub async fn update_comment(&self, key: &str, comment_id: &str, body: &str) -> Result<(), SyncError> {
        let endpoint = format!("/issue/{key}/comment/{comment_id}");
        let url = self.api_url(&endpoint);
        let payload = serde_json::json!({ "body": super::wire::inflate_rich_text(body) });
        self.send_with_retry(&endpoint, || self.authed(self.client.put(&url)).json(&payload)).await?;
        Ok(())
    }

    pub async fn delete_comment(&self, key: &str, comment_id: &str) -> Result<(), SyncError> {
        let endpoint = format!("/issue/{key}/comment/{comment_id}");
        let url = self.api_url(&endpoint);
        self.send_with_retry(&endpoint, || self.authed(self.client.delete(&url))).await?;
        Ok(())
    }

    /// Post a `[JIRA-SYNC]`-attributed mirror comment.
    pub async fn create_sync_comment(&self, key: &str, rendered_body: &str) -> Result<Comment, SyncError> {
        self.create_comment(key, rendered_body).await
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RemoteConfig {
        RemoteConfig {
            base_url: "https://left.example.com/".into(),
            username: "bot".into(),
            api_token: "token".into(),
            project_key: "PROJ".into(),
        }
    }

    #[test]
    fn api_url_strips_trailing_slash_and_adds_rest_prefix() {
        let client = RemoteClient::new(&test_config()).unwrap();
        assert_eq!(client.api_url("/issue/PROJ-1"), "https://left.example.com/rest/api/3/issue/PROJ-1");
    }

    #[test]
    fn project_key_is_exposed() {
        let client = RemoteClient::new(&test_config()).unwrap();
        assert_eq!(client.project_key(), "PROJ");
    }
}

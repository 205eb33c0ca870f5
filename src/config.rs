//! Environment-driven configuration, loaded once at process start.

use crate::error::SyncError;
use crate::models::Side;
use std::env;
use std::time::Duration;

/// Credentials and project scope for one remote ticketing instance.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub left: RemoteConfig,
    pub right: RemoteConfig,
    pub db_path: String,
    pub webhook_secret: String,
    pub sync_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub sync_status_transitions: bool,
    pub sync_assignee: bool,
    pub sync_comments: bool,
    pub bind_addr: String,
}

impl SyncConfig {
    pub fn remote(&self, side: Side) -> &RemoteConfig {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, SyncError> {
        Ok(Self {
            left: remote_config_from_env("LEFT")?,
            right: remote_config_from_env("RIGHT")?,
            db_path: env_or("SYNC_DB_PATH", "ticket-bridge.db"),
            webhook_secret: require_env("WEBHOOK_SECRET")?,
            sync_interval: Duration::from_secs(env_or_parse("SYNC_INTERVAL_SECONDS", 300)?),
            max_retries: env_or_parse("MAX_RETRIES", 3)?,
            retry_delay: Duration::from_secs(env_or_parse("RETRY_DELAY_SECONDS", 5)?),
            sync_status_transitions: env_or_parse_bool("SYNC_STATUS_TRANSITIONS", true)?,
            sync_assignee: env_or_parse_bool("SYNC_ASSIGNEE", false)?,
            sync_comments: env_or_parse_bool("SYNC_COMMENTS", true)?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
        })
    }
}

fn remote_config_from_env(side: &str) -> Result<RemoteConfig, SyncError> {
    Ok(RemoteConfig {
        base_url: require_env(&format!("{side}_BASE_URL"))?,
        username: require_env(&format!("{side}_USERNAME"))?,
        api_token: require_env(&format!("{side}_API_TOKEN"))?,
        project_key: require_env(&format!("{side}_PROJECT_KEY"))?,
    })
}

fn require_env(name: &str) -> Result<String, SyncError> {
    env::var(name).map_err(|_| SyncError::invalid_input_field(format!("missing required environment variable {name}"), name))
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, SyncError> {
    match env::var(name) {
        Ok(v) => v.parse().map_err(|_| SyncError::invalid_input_field(format!("invalid value for {name}"), name)),
        Err(_) => Ok(default),
    }
}

fn env_or_parse_bool(name: &str, default: bool) -> Result<bool, SyncError> {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(SyncError::invalid_input_field(format!("invalid boolean for {name}"), name)),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_vars() {
        for (side, field) in [
            ("LEFT", "BASE_URL"), ("LEFT", "USERNAME"), ("LEFT", "API_TOKEN"), ("LEFT", "PROJECT_KEY"),
            ("RIGHT", "BASE_URL"), ("RIGHT", "USERNAME"), ("RIGHT", "API_TOKEN"), ("RIGHT", "PROJECT_KEY"),
        ] {
            env::set_var(format!("{side}_{field}"), "value");
        }
        env::set_var("WEBHOOK_SECRET", "shh");
    }

    #[test]
    fn loads_defaults_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_vars();
        env::remove_var("SYNC_INTERVAL_SECONDS");
        env::remove_var("MAX_RETRIES");

        let cfg = SyncConfig::from_env().unwrap();
        assert_eq!(cfg.sync_interval, Duration::from_secs(300));
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.sync_status_transitions);
        assert!(!cfg.sync_assignee);
    }

    #[test]
    fn missing_required_var_is_invalid_input() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_vars();
        env::remove_var("WEBHOOK_SECRET");

        let err = SyncConfig::from_env().unwrap_err();
        assert_eq!(err.status_code(), 400);
        env::set_var("WEBHOOK_SECRET", "shh");
    }
}

//! Application configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use spread_alerts::SessionConfig;
use spread_warehouse::RetryPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration, read from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub market_data: MarketDataSettings,
    pub sessions: SessionSettings,
    /// Directory for daily rolling log files. Console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load from `path`. Returns `None` when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("malformed config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Apply `DATABASE_URL` / `DATABASE_FALLBACK_URL` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("DATABASE_FALLBACK_URL").ok(),
        );
    }

    fn apply_overrides(&mut self, primary: Option<String>, fallback: Option<String>) {
        if let Some(url) = primary.filter(|u| !u.is_empty()) {
            self.store.primary_url = url;
        }
        if let Some(url) = fallback.filter(|u| !u.is_empty()) {
            self.store.fallback_url = Some(url);
        }
    }
}

/// Store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub primary_url: String,
    /// Retried with backoff when the primary is down. Defaults to the primary.
    pub fallback_url: Option<String>,
    pub max_connections: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_elapsed_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            primary_url: "sqlite://spread-bot.db".to_string(),
            fallback_url: None,
            max_connections: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 60_000,
            max_elapsed_secs: 30 * 60,
        }
    }
}

impl From<&StoreSettings> for RetryPolicy {
    fn from(settings: &StoreSettings) -> Self {
        RetryPolicy {
            initial_interval: Duration::from_millis(settings.initial_backoff_ms),
            max_interval: Duration::from_millis(settings.max_backoff_ms),
            max_elapsed: Duration::from_secs(settings.max_elapsed_secs),
        }
    }
}

/// Market-data service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    /// Probed once at startup and used if it answers.
    pub local_endpoint: String,
    pub remote_endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            local_endpoint: "http://localhost:8080/spot".to_string(),
            remote_endpoint: "http://spot-service:8080/spot".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl MarketDataSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub max_sessions: usize,
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Zero disables expiry.
    pub max_session_age_secs: u64,
    pub stop_grace_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: 30,
            poll_interval_secs: 120,
            fetch_timeout_secs: 30,
            max_session_age_secs: 24 * 60 * 60,
            stop_grace_secs: 10,
        }
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        SessionConfig {
            max_sessions: settings.max_sessions.max(1),
            poll_interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs.max(1)),
            max_age: (settings.max_session_age_secs > 0)
                .then(|| Duration::from_secs(settings.max_session_age_secs)),
            stop_grace: Duration::from_secs(settings.stop_grace_secs),
        }
    }
}

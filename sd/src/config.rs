//! Configuration for the settlement daemon

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::monitor::MonitorSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the record store directory
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Bind address for the HTTP control surface
    #[serde(default = "default_http_bind")]
    pub http_bind: String,

    /// Log level (overridden by --log-level)
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub ticketing: TicketingConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingConfig {
    #[serde(default = "default_ticketing_base_url")]
    pub base_url: String,

    /// Bearer token for the ticketing API
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_interval_minutes")]
    pub default_interval_minutes: u64,

    /// Acceptance threshold in percent for both quorum axes
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,

    /// Days after dispatch before silent creditors stop blocking
    #[serde(default = "default_response_deadline_days")]
    pub response_deadline_days: i64,

    /// Consecutive failures before a session is flagged erroring
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Cap for the retry backoff, in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("settlementd")
        .join("store")
}

fn default_http_bind() -> String {
    "127.0.0.1:8700".to_string()
}

fn default_ticketing_base_url() -> String {
    "https://support.example.zendesk.com".to_string()
}

fn default_interval_minutes() -> u64 {
    30
}

fn default_threshold_percent() -> f64 {
    crate::aggregate::DEFAULT_THRESHOLD_PERCENT
}

fn default_response_deadline_days() -> i64 {
    30
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_max_backoff_secs() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            http_bind: default_http_bind(),
            log_level: None,
            ticketing: TicketingConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            base_url: default_ticketing_base_url(),
            token: String::new(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: default_interval_minutes(),
            threshold_percent: default_threshold_percent(),
            response_deadline_days: default_response_deadline_days(),
            failure_threshold: default_failure_threshold(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl MonitoringConfig {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            threshold_percent: self.threshold_percent,
            response_deadline_days: self.response_deadline_days,
            failure_threshold: self.failure_threshold,
            max_backoff: std::time::Duration::from_secs(self.max_backoff_secs),
            default_interval_minutes: self.default_interval_minutes,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("settlementd").join("settlementd.yml")),
            Some(PathBuf::from("settlementd.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Read only the log level from a config file, for early logging
    /// setup before the full config is parsed
    pub fn load_log_level(path: Option<&PathBuf>) -> Option<String> {
        Self::load(path).ok().and_then(|c| c.log_level)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

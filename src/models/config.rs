//! shopmon.toml configuration model.

use crate::constants;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub policy: PolicySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Database file; relative paths resolve against the data root.
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicySection {
    /// Forward audit entries to journald.
    #[serde(default)]
    pub journald_audit: bool,
}

fn default_database_path() -> String {
    constants::DEFAULT_DATABASE_FILE.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    constants::DEFAULT_BUSY_TIMEOUT_MS
}

fn default_max_attempts() -> u32 {
    constants::DEFAULT_RETRY_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    constants::DEFAULT_RETRY_BACKOFF_MS
}

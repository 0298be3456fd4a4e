//! Client configuration
//!
//! | Env var | Default | Purpose |
//! |---------|---------|---------|
//! | INTAKE_SERVER_URL | http://localhost:3000 | intake server base URL |
//! | CLIENT_DATA_DIR | ./field-client-data | outbox database directory |
//! | HTTP_TIMEOUT_MS | 15000 | per-request budget |
//! | SYNC_RETRY_CEILING | 5 | attempts before dead-lettering |
//! | SYNC_BACKOFF_BASE_MS | 2000 | first retry delay |
//! | SYNC_BACKOFF_CAP_MS | 300000 | retry delay ceiling (5 min) |
//! | SYNC_INTERVAL_SECS | 30 | background flush cadence |

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Intake server base URL
    pub server_url: String,
    /// Directory holding the outbox database
    pub data_dir: String,
    /// Per-request budget in milliseconds
    pub http_timeout_ms: u64,
    /// Retry and flush tunables
    pub sync: SyncConfig,
}

/// Sync queue tunables
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Transient failures tolerated before an entry is dead-lettered
    pub retry_ceiling: u32,
    /// First retry delay; doubles per attempt
    pub backoff_base: Duration,
    /// Retry delay ceiling
    pub backoff_cap: Duration,
    /// Background flush cadence
    pub flush_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_ceiling: 5,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(300),
            flush_interval: Duration::from_secs(30),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var("INTAKE_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            data_dir: std::env::var("CLIENT_DATA_DIR")
                .unwrap_or_else(|_| "./field-client-data".into()),
            http_timeout_ms: env_parse("HTTP_TIMEOUT_MS", 15_000),
            sync: SyncConfig {
                retry_ceiling: env_parse("SYNC_RETRY_CEILING", 5),
                backoff_base: Duration::from_millis(env_parse("SYNC_BACKOFF_BASE_MS", 2_000)),
                backoff_cap: Duration::from_millis(env_parse("SYNC_BACKOFF_CAP_MS", 300_000)),
                flush_interval: Duration::from_secs(env_parse("SYNC_INTERVAL_SECS", 30)),
            },
        }
    }

    pub fn outbox_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("outbox.redb")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

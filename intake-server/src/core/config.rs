//! Server configuration
//!
//! All tunables load from environment variables with defaults. The dedup,
//! SLA and scoring parameters are deployment configuration, not constants:
//! they are read once here and injected into the services that use them.
//!
//! | Env var | Default | Purpose |
//! |---------|---------|---------|
//! | WORK_DIR | /var/lib/civic/intake | data + log directory |
//! | HTTP_PORT | 3000 | API port |
//! | CLASSIFIER_URL | http://localhost:5001 | AI classifier base URL |
//! | CLASSIFIER_TIMEOUT_MS | 20000 | classifier call budget |
//! | DEDUP_RADIUS_M | 100 | duplicate radius (meters) |
//! | DEDUP_WINDOW_MINUTES | 60 | duplicate time window |
//! | DEDUP_MAX_RESULTS | 5 | duplicate result cap |
//! | SIMILAR_RADIUS_M | 500 | "nearby similar" radius for scoring |
//! | ZONE_CACHE_TTL_SECS | 300 | spatial index refresh cadence |
//! | PEAK_WINDOWS | 8-10,17-20 | two inclusive local-hour peak ranges |
//! | SLA_CRITICAL_MINUTES | 120 | per-tier resolution targets |
//! | SLA_HIGH_MINUTES | 240 | |
//! | SLA_MEDIUM_MINUTES | 480 | |
//! | SLA_LOW_MINUTES | 1440 | |

use std::path::PathBuf;

use shared::types::PriorityTier;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// AI classifier service base URL
    pub classifier_url: String,
    /// Classifier request budget in milliseconds
    pub classifier_timeout_ms: u64,
    /// Duplicate detection tunables
    pub dedup: DedupConfig,
    /// Per-tier SLA targets
    pub sla: SlaConfig,
    /// Zone cache refresh cadence in seconds
    pub zone_cache_ttl_secs: u64,
    /// Peak traffic windows as inclusive local-hour ranges
    pub peak_windows: [(u8, u8); 2],
}

/// Duplicate detection parameters (injected, per-deployment)
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub radius_m: f64,
    pub window_minutes: i64,
    pub max_results: usize,
    /// Wider radius used only for the scorer's nearby-similar count
    pub similar_radius_m: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            radius_m: 100.0,
            window_minutes: 60,
            max_results: 5,
            similar_radius_m: 500.0,
        }
    }
}

/// Per-tier resolution targets in minutes
#[derive(Debug, Clone, Copy)]
pub struct SlaConfig {
    pub critical_minutes: i64,
    pub high_minutes: i64,
    pub medium_minutes: i64,
    pub low_minutes: i64,
}

impl SlaConfig {
    pub fn target_minutes(&self, tier: PriorityTier) -> i64 {
        match tier {
            PriorityTier::Critical => self.critical_minutes,
            PriorityTier::High => self.high_minutes,
            PriorityTier::Medium => self.medium_minutes,
            PriorityTier::Low => self.low_minutes,
        }
    }
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            critical_minutes: 120,
            high_minutes: 240,
            medium_minutes: 480,
            low_minutes: 1440,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse "8-10,17-20" into two inclusive hour ranges; None on any
/// malformed piece so the caller falls back to the default
fn parse_peak_windows(raw: &str) -> Option<[(u8, u8); 2]> {
    let mut windows = [(0u8, 0u8); 2];
    let mut parts = raw.split(',');
    for slot in &mut windows {
        let (start, end) = parts.next()?.trim().split_once('-')?;
        let start: u8 = start.trim().parse().ok()?;
        let end: u8 = end.trim().parse().ok()?;
        if start > end || end > 23 {
            return None;
        }
        *slot = (start, end);
    }
    if parts.next().is_some() {
        return None;
    }
    Some(windows)
}

const DEFAULT_PEAK_WINDOWS: [(u8, u8); 2] = [(8, 10), (17, 20)];

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/civic/intake".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            classifier_url: std::env::var("CLASSIFIER_URL")
                .unwrap_or_else(|_| "http://localhost:5001".into()),
            classifier_timeout_ms: env_parse("CLASSIFIER_TIMEOUT_MS", 20_000),
            dedup: DedupConfig {
                radius_m: env_parse("DEDUP_RADIUS_M", 100.0),
                window_minutes: env_parse("DEDUP_WINDOW_MINUTES", 60),
                max_results: env_parse("DEDUP_MAX_RESULTS", 5),
                similar_radius_m: env_parse("SIMILAR_RADIUS_M", 500.0),
            },
            sla: SlaConfig {
                critical_minutes: env_parse("SLA_CRITICAL_MINUTES", 120),
                high_minutes: env_parse("SLA_HIGH_MINUTES", 240),
                medium_minutes: env_parse("SLA_MEDIUM_MINUTES", 480),
                low_minutes: env_parse("SLA_LOW_MINUTES", 1440),
            },
            zone_cache_ttl_secs: env_parse("ZONE_CACHE_TTL_SECS", 300),
            // Morning and evening peaks, matching municipal traffic patterns
            peak_windows: std::env::var("PEAK_WINDOWS")
                .ok()
                .and_then(|v| parse_peak_windows(&v))
                .unwrap_or(DEFAULT_PEAK_WINDOWS),
        }
    }

    /// Override work dir and port, for tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("intake.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_windows_parse_the_documented_format() {
        assert_eq!(parse_peak_windows("8-10,17-20"), Some(DEFAULT_PEAK_WINDOWS));
        assert_eq!(parse_peak_windows(" 7-9 , 16-19 "), Some([(7, 9), (16, 19)]));
    }

    #[test]
    fn malformed_peak_windows_fall_back() {
        assert_eq!(parse_peak_windows(""), None);
        assert_eq!(parse_peak_windows("8-10"), None);
        assert_eq!(parse_peak_windows("8-10,17-20,21-22"), None);
        assert_eq!(parse_peak_windows("10-8,17-20"), None);
        assert_eq!(parse_peak_windows("8-10,17-25"), None);
        assert_eq!(parse_peak_windows("morning,evening"), None);
    }
}

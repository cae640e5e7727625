use std::time::Duration;

use crate::error::{AppError, Result};

pub const LIVE_SOURCE_URL: &str = "http://localhost:8080/live";

/// Prefix for fixture ids synthesized before the source has assigned one.
pub const PLACEHOLDER_PREFIX: &str = "pending_";

/// Default poll cycle interval (seconds).
pub const POLL_INTERVAL_SECS: u64 = 30;

/// Default minimum time a notification stays on screen before the next one (seconds).
pub const DWELL_SECS: u64 = 8;

/// HTTP timeout for a single live source fetch (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// Timeout applied to every durable/volatile store call made by the engine.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP timeout for the webhook presenter (seconds).
pub const PRESENT_TIMEOUT_SECS: u64 = 5;

/// Channel capacity for notifier commands.
pub const CHANNEL_CAPACITY: usize = 256;

/// Broadcast capacity for tracked-map snapshots. Slow observers skip ahead.
pub const BROADCAST_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct Config {
    pub live_source_url: String,
    /// Sent as `x-apisports-key` when set (LIVE_SOURCE_API_KEY)
    pub live_source_api_key: Option<String>,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Seconds between poll cycles (POLL_INTERVAL_SECS)
    pub poll_interval_secs: u64,
    /// Notification dwell time in seconds (DWELL_SECS)
    pub dwell_secs: u64,
    /// Primary presentation surface. Unset means every notification goes
    /// straight to the host-level fallback (WEBHOOK_URL)
    pub webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            live_source_url: std::env::var("LIVE_SOURCE_URL")
                .unwrap_or_else(|_| LIVE_SOURCE_URL.to_string()),
            live_source_api_key: non_empty_var("LIVE_SOURCE_API_KEY"),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            poll_interval_secs: positive_secs(
                std::env::var("POLL_INTERVAL_SECS").ok(),
                POLL_INTERVAL_SECS,
            ),
            dwell_secs: positive_secs(std::env::var("DWELL_SECS").ok(), DWELL_SECS),
            webhook_url: non_empty_var("WEBHOOK_URL"),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_secs)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Zero or unparsable values fall back to the default.
fn positive_secs(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(default)
}

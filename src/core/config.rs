/*!
 * Monitor Configuration
 *
 * Runtime configuration for background monitors
 */

use super::errors::{MonitorError, MonitorResult};
use super::limits::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_THREAD_NAME, DEFAULT_WORKERS, MAX_WORKERS,
    MIN_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the worker count
pub const ENV_WORKERS: &str = "REACHABILITY_WORKERS";
/// Environment variable overriding the reclamation interval (milliseconds)
pub const ENV_POLL_INTERVAL_MS: &str = "REACHABILITY_POLL_INTERVAL_MS";
/// Environment variable overriding the thread name prefix
pub const ENV_THREAD_NAME: &str = "REACHABILITY_THREAD_NAME";

/// Background monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Number of cleanup workers
    pub workers: usize,
    /// Interval between reclamation passes
    pub poll_interval_ms: u64,
    /// Prefix for worker and reclamation thread names
    pub thread_name: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Default configuration with the given worker count
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[inline]
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check bounds before any thread is spawned
    pub fn validate(&self) -> MonitorResult<()> {
        if self.workers < 1 {
            return Err(MonitorError::invalid_argument(format!(
                "workers must be at least 1, got {}",
                self.workers
            )));
        }
        if self.workers > MAX_WORKERS {
            return Err(MonitorError::invalid_argument(format!(
                "workers must be at most {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(MonitorError::invalid_argument(format!(
                "poll interval must be at least {}ms, got {}ms",
                MIN_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Load configuration from environment variables, falling back to defaults
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(workers) = read_env::<usize>(ENV_WORKERS) {
            config.workers = workers;
        }
        if let Some(interval) = read_env::<u64>(ENV_POLL_INTERVAL_MS) {
            config.poll_interval_ms = interval;
        }
        if let Ok(name) = std::env::var(ENV_THREAD_NAME) {
            if !name.is_empty() {
                config.thread_name = name;
            }
        }

        config
    }

    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> MonitorResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MonitorError::invalid_argument(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

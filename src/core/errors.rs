/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Reachability monitor errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MonitorError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(monitor::invalid_argument),
        help("Targets must be live objects, cleanups must be present, and worker counts must be at least 1.")
    )]
    InvalidArgument(String),

    #[error("Cleanup failed: {0}")]
    #[diagnostic(
        code(monitor::cleanup_failure),
        help("A registered cleanup returned an error or panicked. The monitor keeps running.")
    )]
    CleanupFailure(String),

    #[error("Failed to spawn monitor thread: {0}")]
    #[diagnostic(
        code(monitor::worker_spawn),
        help("The operating system refused to start a thread. Check thread limits.")
    )]
    WorkerSpawn(String),
}

impl MonitorError {
    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        MonitorError::InvalidArgument(msg.into())
    }

    #[inline]
    pub fn cleanup_failure(msg: impl Into<String>) -> Self {
        MonitorError::CleanupFailure(msg.into())
    }

    /// True for errors reported synchronously to the caller
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MonitorError::InvalidArgument(_))
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::WorkerSpawn(err.to_string())
    }
}

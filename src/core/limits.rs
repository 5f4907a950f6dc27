/*!
 * Monitor Limits and Constants
 *
 * Centralized location for defaults and bounds used by the monitor configuration.
 */

// =============================================================================
// WORKER POOL
// =============================================================================

/// Default number of background cleanup workers
pub const DEFAULT_WORKERS: usize = 1;

/// Upper bound on background cleanup workers
pub const MAX_WORKERS: usize = 256;

/// Default prefix for background thread names
pub const DEFAULT_THREAD_NAME: &str = "reachability";

// =============================================================================
// RECLAMATION
// =============================================================================

/// Default interval between background reclamation passes (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Shortest accepted reclamation interval (1ms)
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

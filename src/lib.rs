/*!
 * Reachability Monitor Library
 *
 * Attach cleanup commands to reference-counted objects. A command runs once
 * its object is no longer strongly reachable, without the caller managing an
 * explicit lifecycle or destructor call site.
 *
 * ## Example
 *
 * ```rust
 * use reachability::{background_monitor, ReachabilityMonitor};
 * use std::sync::Arc;
 *
 * let monitor = background_monitor(1)?;
 * let socket = Arc::new(String::from("fd:7"));
 * monitor.when_unreachable(&socket, || println!("closing fd 7"))?;
 * drop(socket);
 * monitor.collect();
 * # Ok::<(), reachability::MonitorError>(())
 * ```
 */

pub mod core;
pub mod factory;
pub mod monitor;
pub mod monitoring;
mod reclaim;
pub mod references;

// Re-exports
pub use crate::core::{
    MonitorConfig, MonitorError, MonitorResult, ReferenceKind, RegistrationId,
};
pub use factory::{
    background_monitor, background_monitor_with_config, default_background_monitor,
    foreground_monitor, strong_reference,
};
pub use monitor::{
    BackgroundMonitor, Cleanup, ForegroundMonitor, IntoCleanup, MonitorState,
    MonitorStatsSnapshot, ReachabilityMonitor,
};
pub use monitoring::init_tracing;
pub use references::{Reference, Referent};
